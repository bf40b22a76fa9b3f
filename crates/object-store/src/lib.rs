//! SQLite + Object Storage Backend
//!
//! This crate provides the persistence layer for the drive: SQLite holds the
//! node records (folders and files, scoped by owner) and pluggable object
//! storage (S3/MinIO/local filesystem/memory) holds file contents.
//!
//! # Features
//!
//! - Node table indexed by `(owner_id, parent_id)` for fast child listings
//! - Streaming, size-capped blob writes that never buffer a whole file
//! - Owner-namespaced blob paths that cannot escape their namespace
//! - Multiple storage backends: S3, MinIO, local filesystem, in-memory
//!
//! # Example
//!
//! ```rust,no_run
//! use ecloud_object_store::{BlobStorage, NodeDatabase, ObjectStoreConfig};
//! use std::path::{Path, PathBuf};
//!
//! # async fn example() -> Result<(), ecloud_object_store::BlobStoreError> {
//! let db = NodeDatabase::new(Path::new("/tmp/ecloud/db.sqlite")).await?;
//! let blobs = BlobStorage::new(ObjectStoreConfig::Local {
//!     path: PathBuf::from("/tmp/ecloud/blobs"),
//! })
//! .await?;
//!
//! let path = BlobStorage::owner_path("alice", "notes/today.txt")?;
//! let content = futures::stream::iter(vec![Ok(bytes::Bytes::from("hi"))]);
//! blobs.put_stream(&path, content, 1024).await?;
//! # let _ = db;
//! # Ok(())
//! # }
//! ```

mod database;
mod error;
mod storage;

pub use database::{NodeDatabase, NodeRow};
pub use error::{BlobStoreError, Result};
pub use object_store::path::Path as ObjectPath;
pub use storage::{BlobStorage, ObjectStoreConfig};
