use std::collections::HashSet;

use uuid::Uuid;

use super::{Drive, DriveError, Node, NodeStoreError, OwnerId};

impl Drive {
    /// Every descendant of `folder` (`None` for the whole tree of `owner`).
    pub async fn collect(
        &self,
        owner: &OwnerId,
        folder: Option<Uuid>,
    ) -> Result<Vec<Node>, DriveError> {
        self.require_folder(owner, folder).await?;
        self.descendants(owner, folder).await
    }

    /// Worklist traversal below `start`. Each folder is expanded at most once
    /// and each node emitted at most once, so malformed topologies (cycles,
    /// duplicate edges) still terminate. Parents are always emitted before
    /// their children.
    pub(crate) async fn descendants(
        &self,
        owner: &OwnerId,
        start: Option<Uuid>,
    ) -> Result<Vec<Node>, DriveError> {
        let mut found = Vec::new();
        let mut emitted = HashSet::new();
        let mut expanded = HashSet::new();
        let mut pending = vec![start];

        while let Some(current) = pending.pop() {
            if !expanded.insert(current) {
                continue;
            }
            for child in self.nodes.list_children(owner, current).await? {
                if !emitted.insert(child.id) {
                    continue;
                }
                if child.is_folder() {
                    pending.push(Some(child.id));
                }
                found.push(child);
            }
        }

        Ok(found)
    }

    /// Delete a node, and for folders everything below it.
    ///
    /// Records are removed children first. Blob removal is best-effort: a
    /// blob that cannot be deleted is logged and its record removed anyway,
    /// so storage may retain orphaned content. Returns how many records were
    /// removed.
    pub async fn rm(&self, owner: &OwnerId, id: Uuid) -> Result<usize, DriveError> {
        let node = self.owned(owner, id).await?;
        let mut removed = 0;

        if node.is_folder() {
            let subtree = self.descendants(owner, Some(node.id)).await?;
            for child in subtree.iter().rev().filter(|c| c.id != node.id) {
                if let Some(path) = child.blob_path.as_deref() {
                    self.discard_blob(path).await;
                }
                if self.nodes.delete(child.id).await? {
                    removed += 1;
                }
            }
        } else if let Some(path) = node.blob_path.as_deref() {
            self.discard_blob(path).await;
        }

        if self.nodes.delete(node.id).await? {
            removed += 1;
        }
        tracing::info!(owner = %owner, node_id = %id, removed, "deleted node");
        Ok(removed)
    }

    /// Re-parent `id` under `new_parent` (`None` for the root).
    ///
    /// Moving to the current parent is a no-op. A folder can never be moved
    /// into itself or any of its descendants.
    pub async fn mv(
        &self,
        owner: &OwnerId,
        id: Uuid,
        new_parent: Option<Uuid>,
    ) -> Result<Node, DriveError> {
        let node = self.owned(owner, id).await?;
        if node.parent_id == new_parent {
            return Ok(node);
        }

        if let Some(target) = new_parent {
            self.require_folder(owner, Some(target)).await?;

            if node.is_folder() {
                let inside = target == node.id
                    || self
                        .descendants(owner, Some(node.id))
                        .await?
                        .iter()
                        .any(|d| d.id == target);
                if inside {
                    return Err(DriveError::MoveIntoDescendant {
                        node: node.id,
                        target,
                    });
                }
            }
        }

        // the store re-checks existence and ownership atomically
        match self.nodes.update_parent(owner, id, new_parent).await {
            Ok(()) => {}
            Err(NodeStoreError::NotFoundOrNotOwner(_)) => {
                return Err(DriveError::NotFound(format!("node {id}")))
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            owner = %owner,
            node_id = %id,
            from = ?node.parent_id,
            to = ?new_parent,
            "moved node"
        );
        self.nodes
            .find_by_id(id)
            .await?
            .ok_or_else(|| DriveError::NotFound(format!("node {id}")))
    }
}
