//! Multi-tenant folder trees over flat node records
//!
//! This module holds the drive engine:
//!
//! - **[`Node`]**: a folder or file record, linked to its parent by id
//! - **[`NodeStore`]**: persistence for node records ([`MemoryNodeStore`], [`SqliteNodeStore`])
//! - **[`BlobStore`]**: owner-namespaced, size-capped byte storage ([`ObjectBlobStore`])
//! - **[`Drive`]**: tree operations and archive ingestion on top of both stores
//!
//! # Architecture
//!
//! ## Trees as parent pointers
//!
//! The store never holds a tree. Each record only knows its parent, and the
//! root is the absence of one (`parent_id == None`):
//! ```text
//!   (root, owner A)
//!        |
//!   +----+-----+
//!   |          |
//!  docs/     a.txt        docs.parent_id  = None
//!   |                     a.txt.parent_id = None
//!  b.pdf                  b.pdf.parent_id = docs.id
//! ```
//! Multi-node operations (recursive listing, cascading delete, cycle checks,
//! stats) rebuild the shape on demand with an explicit worklist and a visited
//! set, so they terminate even if stored edges are malformed.
//!
//! ## Ownership
//!
//! Every operation takes the caller's [`OwnerId`]. Looking up a node that
//! exists but belongs to someone else fails with [`DriveError::Forbidden`];
//! child listings are always scoped to the caller so other owners' records
//! never show up in traversals.
//!
//! ## Consistency
//!
//! The node store only offers atomic single-record operations. Moves and
//! cascading deletes are therefore not atomic across a subtree. Archive
//! ingestion compensates instead: everything it created is undone in reverse
//! order when a later step fails.

mod archive;
mod backend;
mod blobs;
mod error;
mod limits;
pub mod mime;
mod node;
mod stats;
mod store;
mod tree;

use std::sync::Arc;

use futures::StreamExt;
use uuid::Uuid;

pub use archive::ExtractReport;
pub use backend::{ObjectBlobStore, SqliteNodeStore};
pub use blobs::{sanitize_file_name, BlobError, BlobStore, ByteStream, FileUpload, SavedBlob};
pub use error::{ArchiveViolation, DriveError, ErrorKind};
pub use limits::DriveLimits;
pub use node::{NewNode, Node, NodeKind, OwnerId};
pub use stats::{FolderStats, StatsBucket};
pub use store::{BoxError, MemoryNodeStore, NodeStore, NodeStoreError};

/// Longest folder or file name accepted, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// The tree engine. Cheap to clone; all state lives in the stores.
#[derive(Debug, Clone)]
pub struct Drive {
    nodes: Arc<dyn NodeStore>,
    blobs: Arc<dyn BlobStore>,
    limits: DriveLimits,
}

impl Drive {
    pub fn new(nodes: Arc<dyn NodeStore>, blobs: Arc<dyn BlobStore>, limits: DriveLimits) -> Self {
        Self {
            nodes,
            blobs,
            limits,
        }
    }

    pub fn nodes(&self) -> &Arc<dyn NodeStore> {
        &self.nodes
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn limits(&self) -> &DriveLimits {
        &self.limits
    }

    /// Create a folder under `parent` (`None` for the root).
    pub async fn mkdir(
        &self,
        owner: &OwnerId,
        parent: Option<Uuid>,
        name: &str,
    ) -> Result<Node, DriveError> {
        let name = validate_name(name)?;
        self.require_folder(owner, parent).await?;

        let node = self
            .nodes
            .create(NewNode::folder(owner, parent, name))
            .await?;
        tracing::info!(owner = %owner, node_id = %node.id, name = %node.name, "created folder");
        Ok(node)
    }

    /// Direct children of `parent`.
    pub async fn ls(&self, owner: &OwnerId, parent: Option<Uuid>) -> Result<Vec<Node>, DriveError> {
        self.require_folder(owner, parent).await?;
        Ok(self.nodes.list_children(owner, parent).await?)
    }

    /// Store an uploaded file under `parent`.
    ///
    /// Without a usable `declared_mime` the type is sniffed from the leading
    /// bytes as they stream past.
    pub async fn add(
        &self,
        owner: &OwnerId,
        parent: Option<Uuid>,
        upload: FileUpload<'_>,
        declared_mime: Option<String>,
    ) -> Result<Node, DriveError> {
        self.require_folder(owner, parent).await?;
        let name = validate_name(&sanitize_file_name(&upload.file_name))?;

        let mut head = Vec::with_capacity(mime::SNIFF_LEN);
        let content = upload
            .content
            .inspect(|chunk| {
                if let Ok(bytes) = chunk {
                    mime::fill_head(&mut head, bytes);
                }
            })
            .boxed();
        let saved = self
            .blobs
            .save_simple(owner, FileUpload::new(name.clone(), content))
            .await?;

        let content_type = declared_mime
            .filter(|m| !m.trim().is_empty() && m != "application/octet-stream")
            .unwrap_or_else(|| mime::detect(&head, &name));

        let new = NewNode::file(owner, parent, name, saved.size, content_type, &saved.path);
        match self.nodes.create(new).await {
            Ok(node) => {
                tracing::info!(
                    owner = %owner,
                    node_id = %node.id,
                    size = node.size,
                    path = %saved.path,
                    "stored file"
                );
                Ok(node)
            }
            Err(e) => {
                self.discard_blob(&saved.path).await;
                Err(e.into())
            }
        }
    }

    /// Open a file's content for reading.
    pub async fn cat(&self, owner: &OwnerId, id: Uuid) -> Result<(Node, ByteStream<'static>), DriveError> {
        let node = self.owned(owner, id).await?;
        let Some(path) = node.blob_path.as_deref().filter(|_| node.is_file()) else {
            return Err(DriveError::InvalidInput(format!("{id} is not a file")));
        };

        let stream = match self.blobs.open(path).await {
            Ok(stream) => stream,
            Err(BlobError::NotFound(_)) => {
                return Err(DriveError::NotFound(format!("content of {id}")))
            }
            Err(e) => return Err(e.into()),
        };
        Ok((node, stream))
    }

    /// The parent folder of `id`, `None` at the root or when the parent
    /// record no longer exists.
    pub async fn parent(&self, owner: &OwnerId, id: Uuid) -> Result<Option<Node>, DriveError> {
        let node = self.owned(owner, id).await?;
        let Some(parent_id) = node.parent_id else {
            return Ok(None);
        };

        match self.nodes.find_by_id(parent_id).await? {
            None => Ok(None),
            Some(parent) if &parent.owner_id != owner => Err(DriveError::Forbidden(parent_id)),
            Some(parent) => Ok(Some(parent)),
        }
    }

    /// Resolve `id`: missing is NotFound, someone else's is Forbidden.
    async fn owned(&self, owner: &OwnerId, id: Uuid) -> Result<Node, DriveError> {
        match self.nodes.find_by_id(id).await? {
            None => Err(DriveError::NotFound(format!("node {id}"))),
            Some(node) if &node.owner_id != owner => Err(DriveError::Forbidden(id)),
            Some(node) => Ok(node),
        }
    }

    /// `parent` must be the root or an existing folder of `owner`.
    async fn require_folder(&self, owner: &OwnerId, parent: Option<Uuid>) -> Result<(), DriveError> {
        let Some(id) = parent else {
            return Ok(());
        };
        match self.nodes.find_by_id(id).await? {
            None => Err(DriveError::NotFound(format!("parent {id}"))),
            Some(node) if &node.owner_id != owner => Err(DriveError::Forbidden(id)),
            Some(node) if !node.is_folder() => {
                Err(DriveError::InvalidInput(format!("parent {id} is not a folder")))
            }
            Some(_) => Ok(()),
        }
    }

    /// Best-effort blob removal. A missing or undeletable blob never blocks
    /// removal of the record that pointed at it.
    async fn discard_blob(&self, path: &str) {
        if let Err(e) = self.blobs.delete(path).await {
            tracing::warn!(path = %path, error = %e, "failed to delete blob");
        }
    }
}

fn validate_name(name: &str) -> Result<String, DriveError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DriveError::InvalidInput("name is empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(DriveError::InvalidInput(format!(
            "name longer than {MAX_NAME_LEN} bytes"
        )));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(DriveError::InvalidInput(format!("invalid name {name:?}")));
    }
    Ok(name.to_string())
}
