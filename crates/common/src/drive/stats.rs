use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::{Drive, DriveError, Node, OwnerId};

const FOLDER_BUCKET: &str = "folder";
const UNKNOWN_BUCKET: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsBucket {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: usize,
    pub percent: f64,
}

/// Item counts under a folder, bucketed by kind and extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderStats {
    #[serde(rename = "parent_id")]
    pub folder_id: Option<Uuid>,
    #[serde(skip)]
    pub recursive: bool,
    #[serde(rename = "total_items")]
    pub total: usize,
    /// Sorted by bucket name.
    #[serde(rename = "stats")]
    pub buckets: Vec<StatsBucket>,
}

impl FolderStats {
    pub fn tally(folder_id: Option<Uuid>, recursive: bool, nodes: &[Node]) -> Self {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for node in nodes {
            *counts.entry(bucket_for(node)).or_default() += 1;
        }

        let total = nodes.len();
        let buckets = counts
            .into_iter()
            .map(|(kind, count)| StatsBucket {
                kind,
                count,
                percent: percent_of(count, total),
            })
            .collect();

        Self {
            folder_id,
            recursive,
            total,
            buckets,
        }
    }

    pub fn bucket(&self, kind: &str) -> Option<&StatsBucket> {
        self.buckets.iter().find(|b| b.kind == kind)
    }
}

fn bucket_for(node: &Node) -> String {
    if node.is_folder() {
        return FOLDER_BUCKET.to_string();
    }
    match node.name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
        _ => UNKNOWN_BUCKET.to_string(),
    }
}

/// Share of `total`, rounded half-up to two decimals. Zero when empty.
fn percent_of(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    // hundredths of a percent, rounded half-up without going through a float
    let (count, total) = (count as u64, total as u64);
    let hundredths = (2 * count * 10_000 + total) / (2 * total);
    hundredths as f64 / 100.0
}

impl Drive {
    /// Bucket the children of `folder` (`None` for the root), or all of its
    /// descendants when `recursive` is set.
    pub async fn stats(
        &self,
        owner: &OwnerId,
        folder: Option<Uuid>,
        recursive: bool,
    ) -> Result<FolderStats, DriveError> {
        self.require_folder(owner, folder).await?;
        let nodes = if recursive {
            self.descendants(owner, folder).await?
        } else {
            self.nodes.list_children(owner, folder).await?
        };
        Ok(FolderStats::tally(folder, recursive, &nodes))
    }
}
