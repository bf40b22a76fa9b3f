use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::error::ErrorKind;
use super::node::{NewNode, Node, OwnerId};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum NodeStoreError {
    #[error("node {0} not found or not owned by caller")]
    NotFoundOrNotOwner(Uuid),
    #[error("node store backend: {0}")]
    Backend(#[source] BoxError),
}

impl NodeStoreError {
    pub fn backend(e: impl Into<BoxError>) -> Self {
        NodeStoreError::Backend(e.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NodeStoreError::NotFoundOrNotOwner(_) => ErrorKind::NotFound,
            NodeStoreError::Backend(_) => ErrorKind::StoreFailure,
        }
    }
}

/// Persistence for node records.
///
/// Lookups by id are unscoped so the engine can tell "missing" apart from
/// "owned by someone else". Child listings and re-parenting are always
/// scoped to an owner.
#[async_trait]
pub trait NodeStore: Send + Sync + std::fmt::Debug {
    /// Insert a node, assigning its id and timestamps.
    async fn create(&self, node: NewNode) -> Result<Node, NodeStoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Node>, NodeStoreError>;

    /// Direct children of `parent` (`None` for the root) owned by `owner`,
    /// oldest first with ties broken by id.
    async fn list_children(
        &self,
        owner: &OwnerId,
        parent: Option<Uuid>,
    ) -> Result<Vec<Node>, NodeStoreError>;

    /// Remove a single record. Returns whether anything was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, NodeStoreError>;

    /// Re-parent `id`, matching on both id and owner.
    async fn update_parent(
        &self,
        owner: &OwnerId,
        id: Uuid,
        new_parent: Option<Uuid>,
    ) -> Result<(), NodeStoreError>;

    /// Readiness probe.
    async fn ping(&self) -> Result<(), NodeStoreError> {
        Ok(())
    }
}

/// Node store kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryNodeStore {
    nodes: Arc<RwLock<HashMap<Uuid, Node>>>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a record verbatim, bypassing id and timestamp assignment.
    pub fn insert(&self, node: Node) {
        self.nodes.write().insert(node.id, node);
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Every record belonging to `owner`, in no particular order.
    pub fn all_for(&self, owner: &OwnerId) -> Vec<Node> {
        self.nodes
            .read()
            .values()
            .filter(|n| &n.owner_id == owner)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    async fn create(&self, node: NewNode) -> Result<Node, NodeStoreError> {
        let node = node.into_node(Utc::now());
        self.nodes.write().insert(node.id, node.clone());
        Ok(node)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Node>, NodeStoreError> {
        Ok(self.nodes.read().get(&id).cloned())
    }

    async fn list_children(
        &self,
        owner: &OwnerId,
        parent: Option<Uuid>,
    ) -> Result<Vec<Node>, NodeStoreError> {
        let mut children: Vec<Node> = self
            .nodes
            .read()
            .values()
            .filter(|n| &n.owner_id == owner && n.parent_id == parent)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(children)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, NodeStoreError> {
        Ok(self.nodes.write().remove(&id).is_some())
    }

    async fn update_parent(
        &self,
        owner: &OwnerId,
        id: Uuid,
        new_parent: Option<Uuid>,
    ) -> Result<(), NodeStoreError> {
        let mut nodes = self.nodes.write();
        match nodes.get_mut(&id) {
            Some(node) if &node.owner_id == owner => {
                node.parent_id = new_parent;
                node.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(NodeStoreError::NotFoundOrNotOwner(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_children_are_owner_scoped() {
        let store = MemoryNodeStore::new();
        let alice = OwnerId::new("alice");
        let bob = OwnerId::new("bob");

        let a = store.create(NewNode::folder(&alice, None, "a")).await.unwrap();
        store.create(NewNode::folder(&bob, None, "b")).await.unwrap();
        store
            .create(NewNode::folder(&alice, Some(a.id), "nested"))
            .await
            .unwrap();

        let root = store.list_children(&alice, None).await.unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].name, "a");

        assert!(store.list_children(&bob, Some(a.id)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_parent_checks_owner() {
        let store = MemoryNodeStore::new();
        let alice = OwnerId::new("alice");
        let node = store.create(NewNode::folder(&alice, None, "x")).await.unwrap();

        let err = store
            .update_parent(&OwnerId::new("mallory"), node.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeStoreError::NotFoundOrNotOwner(id) if id == node.id));

        let missing = Uuid::new_v4();
        assert!(store.update_parent(&alice, missing, None).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let store = MemoryNodeStore::new();
        let node = store
            .create(NewNode::folder(&OwnerId::new("a"), None, "x"))
            .await
            .unwrap();
        assert!(store.delete(node.id).await.unwrap());
        assert!(!store.delete(node.id).await.unwrap());
        assert!(store.is_empty());
    }
}
