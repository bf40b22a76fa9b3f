//! Object storage backend abstraction (S3/MinIO/local filesystem/memory).
//!
//! Every blob lives under `owners/<owner>/...`. Callers hand in paths relative
//! to their owner namespace; the storage layer normalizes them and refuses
//! anything that would resolve outside of it.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, WriteMultipart};
use serde::{Deserialize, Serialize};

use crate::error::{BlobStoreError, Result};

/// Top-level prefix all owner namespaces hang off.
const OWNERS_PREFIX: &str = "owners";

/// Size of each multipart chunk buffered before it is handed to the backend.
const PART_SIZE: usize = 5 * 1024 * 1024;

/// Upper bound on multipart chunks in flight for a single upload.
const MAX_PARTS_IN_FLIGHT: usize = 2;

/// Configuration for the object storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Local filesystem storage
    Local {
        /// Path to the storage directory
        path: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Bucket name
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

/// Wrapper around different object storage backends.
#[derive(Debug, Clone)]
pub struct BlobStorage {
    inner: Arc<dyn ObjectStore>,
}

impl BlobStorage {
    /// Create a new storage backend from configuration.
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        let inner: Arc<dyn ObjectStore> = match &config {
            ObjectStoreConfig::Memory => Arc::new(InMemory::new()),

            ObjectStoreConfig::Local { path } => {
                // Ensure directory exists
                tokio::fs::create_dir_all(path).await?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(path)
                        .map_err(|e| BlobStoreError::InvalidConfig(e.to_string()))?,
                )
            }

            ObjectStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => {
                let builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"));

                let store: Arc<dyn ObjectStore> = Arc::new(
                    builder
                        .build()
                        .map_err(|e| BlobStoreError::InvalidConfig(e.to_string()))?,
                );

                // Fail fast if the bucket doesn't exist
                let prefix = ObjectPath::from("");
                let first = store.list(Some(&prefix)).try_next().await;
                match first {
                    Ok(_) => {}
                    Err(object_store::Error::NotFound { .. }) => {
                        return Err(BlobStoreError::BucketNotFound(bucket.clone()));
                    }
                    Err(e) => {
                        let msg = e.to_string();
                        if msg.contains("NoSuchBucket")
                            || msg.contains("bucket") && msg.contains("not")
                        {
                            return Err(BlobStoreError::BucketNotFound(bucket.clone()));
                        }
                        return Err(e.into());
                    }
                }

                store
            }
        };

        Ok(Self { inner })
    }

    /// Create an in-memory storage backend.
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
        }
    }

    /// Resolve `relative` inside the namespace of `owner`.
    ///
    /// Backslashes are treated as separators, empty and `.` segments are
    /// dropped, and any `..` segment is rejected outright.
    pub fn owner_path(owner: &str, relative: &str) -> Result<ObjectPath> {
        if owner.is_empty() || owner == "." || owner == ".." || owner.contains(['/', '\\']) {
            return Err(BlobStoreError::InvalidPath(format!("bad owner segment {owner:?}")));
        }

        let clean = normalize_relative(relative)?;
        let path = ObjectPath::parse(format!("{OWNERS_PREFIX}/{owner}/{clean}"))
            .map_err(|e| BlobStoreError::InvalidPath(e.to_string()))?;

        let base = ObjectPath::from_iter([OWNERS_PREFIX, owner]);
        let inside = path
            .prefix_match(&base)
            .is_some_and(|mut rest| rest.next().is_some());
        if inside {
            Ok(path)
        } else {
            Err(BlobStoreError::InvalidPath(relative.to_string()))
        }
    }

    /// Parse a physical path previously returned by [`Self::owner_path`].
    pub fn physical_path(path: &str) -> Result<ObjectPath> {
        let parsed =
            ObjectPath::parse(path).map_err(|e| BlobStoreError::InvalidPath(e.to_string()))?;
        let mut parts = parsed.parts();
        let under_owners = parts.next().is_some_and(|p| p.as_ref() == OWNERS_PREFIX);
        // owner segment plus at least one name segment
        if !under_owners || parts.count() < 2 {
            return Err(BlobStoreError::InvalidPath(path.to_string()));
        }
        Ok(parsed)
    }

    /// Stream `content` into `path`, never holding more than a couple of
    /// chunks in memory.
    ///
    /// If the stream yields more than `max_size` bytes or fails, the upload is
    /// aborted and nothing is left behind at `path`. Returns the byte count.
    pub async fn put_stream<S>(&self, path: &ObjectPath, mut content: S, max_size: u64) -> Result<u64>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Unpin + Send,
    {
        let upload = self.inner.put_multipart(path).await?;
        let mut writer = WriteMultipart::new_with_chunk_size(upload, PART_SIZE);
        let mut written: u64 = 0;

        while let Some(chunk) = content.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    abort_upload(writer, path).await;
                    return Err(BlobStoreError::Stream(e));
                }
            };

            written += chunk.len() as u64;
            if written > max_size {
                abort_upload(writer, path).await;
                return Err(BlobStoreError::TooLarge { limit: max_size });
            }

            if let Err(e) = writer.wait_for_capacity(MAX_PARTS_IN_FLIGHT).await {
                abort_upload(writer, path).await;
                return Err(e.into());
            }
            writer.write(&chunk);
        }

        writer.finish().await?;
        tracing::debug!(path = %path, size = written, "stored blob");
        Ok(written)
    }

    /// Open a blob for streaming reads.
    pub async fn get_stream(
        &self,
        path: &ObjectPath,
    ) -> Result<BoxStream<'static, std::io::Result<Bytes>>> {
        match self.inner.get(path).await {
            Ok(result) => Ok(result
                .into_stream()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
                .boxed()),
            Err(object_store::Error::NotFound { .. }) => {
                Err(BlobStoreError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Size of a stored blob, or `None` if it does not exist.
    pub async fn size(&self, path: &ObjectPath) -> Result<Option<u64>> {
        match self.inner.head(path).await {
            Ok(meta) => Ok(Some(meta.size as u64)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob. Deleting a missing blob is not an error.
    pub async fn delete(&self, path: &ObjectPath) -> Result<()> {
        match self.inner.delete(path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

async fn abort_upload(writer: WriteMultipart, path: &ObjectPath) {
    if let Err(e) = writer.abort().await {
        tracing::warn!(path = %path, error = %e, "failed to abort multipart upload");
    }
}

fn normalize_relative(relative: &str) -> Result<String> {
    let unified = relative.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(BlobStoreError::InvalidPath(relative.to_string())),
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err(BlobStoreError::InvalidPath(relative.to_string()));
    }
    Ok(segments.join("/"))
}
