use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque tenant identifier. Every node belongs to exactly one owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OwnerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Folder => "folder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(NodeKind::File),
            "folder" => Some(NodeKind::Folder),
            _ => None,
        }
    }
}

/// A folder or file in an owner's tree.
///
/// `parent_id == None` places the node directly under the owner's root.
/// Folders never carry a `blob_path`; files always do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub owner_id: OwnerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, rename = "path", skip_serializing_if = "Option::is_none")]
    pub blob_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}

/// The fields a caller supplies when creating a node. The store assigns the
/// id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub owner_id: OwnerId,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub kind: NodeKind,
    pub size: u64,
    pub mime: Option<String>,
    pub blob_path: Option<String>,
}

impl NewNode {
    pub fn folder(owner: &OwnerId, parent_id: Option<Uuid>, name: impl Into<String>) -> Self {
        Self {
            owner_id: owner.clone(),
            parent_id,
            name: name.into(),
            kind: NodeKind::Folder,
            size: 0,
            mime: None,
            blob_path: None,
        }
    }

    pub fn file(
        owner: &OwnerId,
        parent_id: Option<Uuid>,
        name: impl Into<String>,
        size: u64,
        mime: impl Into<String>,
        blob_path: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner.clone(),
            parent_id,
            name: name.into(),
            kind: NodeKind::File,
            size,
            mime: Some(mime.into()),
            blob_path: Some(blob_path.into()),
        }
    }

    /// Materialize the record with a fresh id, stamped at `now`.
    pub fn into_node(self, now: DateTime<Utc>) -> Node {
        Node {
            id: Uuid::new_v4(),
            owner_id: self.owner_id,
            parent_id: self.parent_id,
            name: self.name,
            kind: self.kind,
            size: self.size,
            mime: self.mime,
            blob_path: self.blob_path,
            created_at: now,
            updated_at: now,
        }
    }
}
