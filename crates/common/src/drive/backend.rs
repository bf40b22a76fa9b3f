//! Adapters binding the drive traits to the SQLite + object storage backend.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use object_store::{BlobStorage, BlobStoreError, NodeDatabase, NodeRow};
use uuid::Uuid;

use super::blobs::{sanitize_file_name, BlobError, BlobStore, ByteStream, FileUpload, SavedBlob};
use super::node::{NewNode, Node, NodeKind, OwnerId};
use super::store::{NodeStore, NodeStoreError};

impl From<BlobStoreError> for BlobError {
    fn from(e: BlobStoreError) -> Self {
        match e {
            BlobStoreError::InvalidPath(p) => BlobError::InvalidPath(p),
            BlobStoreError::TooLarge { limit } => BlobError::TooLarge { limit },
            BlobStoreError::NotFound(p) => BlobError::NotFound(p),
            BlobStoreError::Stream(e) => BlobError::Stream(e),
            other => BlobError::Backend(Box::new(other)),
        }
    }
}

/// [`NodeStore`] backed by the SQLite `nodes` table.
#[derive(Debug, Clone)]
pub struct SqliteNodeStore {
    db: NodeDatabase,
}

impl SqliteNodeStore {
    pub fn new(db: NodeDatabase) -> Self {
        Self { db }
    }

    /// Fresh in-memory database, handy for tests and ephemeral runs.
    pub async fn in_memory() -> Result<Self, NodeStoreError> {
        let db = NodeDatabase::in_memory()
            .await
            .map_err(NodeStoreError::backend)?;
        Ok(Self::new(db))
    }
}

fn to_row(node: &Node) -> NodeRow {
    NodeRow {
        id: node.id.to_string(),
        owner_id: node.owner_id.as_str().to_string(),
        parent_id: node.parent_id.map(|p| p.to_string()),
        name: node.name.clone(),
        kind: node.kind.as_str().to_string(),
        size: node.size as i64,
        mime: node.mime.clone(),
        blob_path: node.blob_path.clone(),
        created_at: node.created_at.timestamp_millis(),
        updated_at: node.updated_at.timestamp_millis(),
    }
}

fn from_row(row: NodeRow) -> Result<Node, NodeStoreError> {
    let corrupt = |what: &str| {
        NodeStoreError::backend(BlobStoreError::CorruptRecord(format!(
            "node {}: bad {what}",
            row.id
        )))
    };

    let id = Uuid::parse_str(&row.id).map_err(|_| corrupt("id"))?;
    let parent_id = match &row.parent_id {
        Some(p) => Some(Uuid::parse_str(p).map_err(|_| corrupt("parent_id"))?),
        None => None,
    };
    let kind = NodeKind::parse(&row.kind).ok_or_else(|| corrupt("kind"))?;
    let created_at =
        DateTime::<Utc>::from_timestamp_millis(row.created_at).ok_or_else(|| corrupt("created_at"))?;
    let updated_at =
        DateTime::<Utc>::from_timestamp_millis(row.updated_at).ok_or_else(|| corrupt("updated_at"))?;

    Ok(Node {
        id,
        owner_id: OwnerId::new(row.owner_id),
        parent_id,
        name: row.name,
        kind,
        size: row.size.max(0) as u64,
        mime: row.mime,
        blob_path: row.blob_path,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl NodeStore for SqliteNodeStore {
    async fn create(&self, node: NewNode) -> Result<Node, NodeStoreError> {
        let node = node.into_node(Utc::now());
        self.db
            .insert_node(&to_row(&node))
            .await
            .map_err(NodeStoreError::backend)?;
        Ok(node)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Node>, NodeStoreError> {
        let row = self
            .db
            .get_node(&id.to_string())
            .await
            .map_err(NodeStoreError::backend)?;
        row.map(from_row).transpose()
    }

    async fn list_children(
        &self,
        owner: &OwnerId,
        parent: Option<Uuid>,
    ) -> Result<Vec<Node>, NodeStoreError> {
        let parent = parent.map(|p| p.to_string());
        let rows = self
            .db
            .list_children(owner.as_str(), parent.as_deref())
            .await
            .map_err(NodeStoreError::backend)?;
        rows.into_iter().map(from_row).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, NodeStoreError> {
        self.db
            .delete_node(&id.to_string())
            .await
            .map_err(NodeStoreError::backend)
    }

    async fn update_parent(
        &self,
        owner: &OwnerId,
        id: Uuid,
        new_parent: Option<Uuid>,
    ) -> Result<(), NodeStoreError> {
        let parent = new_parent.map(|p| p.to_string());
        let updated = self
            .db
            .update_parent(
                owner.as_str(),
                &id.to_string(),
                parent.as_deref(),
                Utc::now().timestamp_millis(),
            )
            .await
            .map_err(NodeStoreError::backend)?;

        if updated {
            Ok(())
        } else {
            Err(NodeStoreError::NotFoundOrNotOwner(id))
        }
    }

    async fn ping(&self) -> Result<(), NodeStoreError> {
        self.db.ping().await.map_err(NodeStoreError::backend)
    }
}

/// [`BlobStore`] over any configured object storage backend.
#[derive(Debug, Clone)]
pub struct ObjectBlobStore {
    storage: BlobStorage,
    max_upload_bytes: u64,
}

impl ObjectBlobStore {
    pub fn new(storage: BlobStorage, max_upload_bytes: u64) -> Self {
        Self {
            storage,
            max_upload_bytes,
        }
    }

    /// In-memory object storage.
    pub fn memory(max_upload_bytes: u64) -> Self {
        Self::new(BlobStorage::memory(), max_upload_bytes)
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn save_from_stream(
        &self,
        owner: &OwnerId,
        relative_path: &str,
        content: ByteStream<'_>,
        max_size: u64,
    ) -> Result<SavedBlob, BlobError> {
        let path = BlobStorage::owner_path(owner.as_str(), relative_path)?;
        let size = self.storage.put_stream(&path, content, max_size).await?;
        Ok(SavedBlob {
            path: path.to_string(),
            size,
        })
    }

    async fn save_simple(
        &self,
        owner: &OwnerId,
        upload: FileUpload<'_>,
    ) -> Result<SavedBlob, BlobError> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let stored_name = format!("{nanos}_{}", sanitize_file_name(&upload.file_name));
        self.save_from_stream(owner, &stored_name, upload.content, self.max_upload_bytes)
            .await
    }

    async fn open(&self, path: &str) -> Result<ByteStream<'static>, BlobError> {
        let path = BlobStorage::physical_path(path)?;
        Ok(self.storage.get_stream(&path).await?)
    }

    async fn stat(&self, path: &str) -> Result<Option<u64>, BlobError> {
        let path = BlobStorage::physical_path(path)?;
        Ok(self.storage.size(&path).await?)
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        let path = BlobStorage::physical_path(path)?;
        Ok(self.storage.delete(&path).await?)
    }
}
