//! Archive ingestion
//!
//! An uploaded zip moves through these stages, failing at the first problem:
//!
//! 1. the target parent is validated
//! 2. the upload is staged into an anonymous temp file, capped at the archive limit
//! 3. the central directory is parsed and every entry planned (see [`plan`])
//! 4. a fresh root folder is created for the extraction
//! 5. entries are materialized as folders and files under that root
//!
//! Nothing is written before stage 4, so violations found while planning need
//! no cleanup. From stage 4 on, every blob and node written is pushed onto an
//! undo stack which is unwound in reverse if a later step fails.
//!
//! Decompression runs on a blocking thread ([`reader`]) and hands each entry
//! over as a bounded channel of chunks, so memory use does not depend on entry
//! sizes.

mod plan;
mod reader;

use std::collections::HashMap;
use std::fs::File;
use std::io::SeekFrom;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use uuid::Uuid;
use zip::ZipArchive;

use super::{
    mime, ArchiveViolation, BlobError, ByteStream, Drive, DriveError, DriveLimits, FileUpload,
    NewNode, Node, OwnerId,
};
use plan::{EntryPlan, PlannedEntry};
use reader::EntryBody;

/// Longest base name kept for the extraction root, in bytes.
const MAX_ROOT_BASE_LEN: usize = 200;

/// Everything an extraction created.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractReport {
    pub created_count: usize,
    pub created_nodes: Vec<Node>,
    pub created_paths: Vec<String>,
    pub root_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

impl Drive {
    /// Extract a zip archive into a new folder under `parent`.
    ///
    /// The new folder is named after the archive with a timestamp suffix.
    /// Partial work is undone on failure, and the error comes back wrapped
    /// in [`DriveError::RolledBack`].
    pub async fn unzip(
        &self,
        owner: &OwnerId,
        parent: Option<Uuid>,
        upload: FileUpload<'_>,
    ) -> Result<ExtractReport, DriveError> {
        self.require_folder(owner, parent).await?;

        let staged = stage(upload.content, self.limits.max_archive_bytes).await?;
        let (archive, entries) = open(staged, self.limits.clone()).await?;
        tracing::debug!(owner = %owner, entries = entries.len(), "archive planned");

        let root_name = root_folder_name(&upload.file_name, Utc::now());
        let root = self
            .nodes
            .create(NewNode::folder(owner, parent, root_name))
            .await?;

        let mut extraction = Extraction::new(self, owner, root);
        match extraction.run(archive, entries).await {
            Ok(()) => {
                let report = extraction.into_report();
                tracing::info!(
                    owner = %owner,
                    root_id = %report.root_id,
                    created = report.created_count,
                    "extracted archive"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "extraction failed, rolling back");
                extraction.rollback().await;
                Err(DriveError::RolledBack(Box::new(e)))
            }
        }
    }
}

/// Copy the upload into an anonymous temp file, refusing more than `limit`
/// bytes.
async fn stage(mut content: ByteStream<'_>, limit: u64) -> Result<File, DriveError> {
    let mut file = tokio::fs::File::from_std(tempfile::tempfile()?);
    let mut written: u64 = 0;

    while let Some(chunk) = content.next().await {
        let chunk = chunk.map_err(DriveError::Content)?;
        written += chunk.len() as u64;
        if written > limit {
            return Err(ArchiveViolation::ArchiveTooLarge { limit }.into());
        }
        file.write_all(&chunk).await?;
    }
    if written == 0 {
        return Err(ArchiveViolation::Empty.into());
    }

    file.flush().await?;
    file.seek(SeekFrom::Start(0)).await?;
    Ok(file.into_std().await)
}

/// Parse the central directory and plan every entry, off the async runtime.
async fn open(
    staged: File,
    limits: DriveLimits,
) -> Result<(ZipArchive<File>, Vec<PlannedEntry>), DriveError> {
    let opened = tokio::task::spawn_blocking(move || {
        let mut archive =
            ZipArchive::new(staged).map_err(|e| ArchiveViolation::Malformed(e.to_string()))?;
        let entries = plan::plan_archive(&mut archive, &limits)?;
        Ok::<_, ArchiveViolation>((archive, entries))
    })
    .await
    .map_err(|e| DriveError::Internal(format!("archive planner panicked: {e}")))?;

    Ok(opened?)
}

/// `<base>_<unix seconds>`, where base is the archive name without its
/// extension and with separators flattened.
fn root_folder_name(file_name: &str, now: DateTime<Utc>) -> String {
    let stem = match file_name.rfind('.') {
        Some(dot) if !file_name[dot..].contains(['/', '\\']) => &file_name[..dot],
        _ => file_name,
    };
    let mut base = stem.trim().replace(['/', '\\'], "_");
    if base.is_empty() {
        base = "unzipped".to_string();
    }
    if base.len() > MAX_ROOT_BASE_LEN {
        let mut cut = MAX_ROOT_BASE_LEN;
        while !base.is_char_boundary(cut) {
            cut -= 1;
        }
        base.truncate(cut);
    }
    format!("{base}_{}", now.timestamp())
}

/// A compensating action for something an extraction created.
#[derive(Debug)]
enum Undo {
    Blob(String),
    Node(Uuid),
}

struct Extraction<'d> {
    drive: &'d Drive,
    owner: &'d OwnerId,
    root: Node,
    undo: Vec<Undo>,
    created_nodes: Vec<Node>,
    created_paths: Vec<String>,
    /// joined folder path below the root -> folder id
    folders: HashMap<String, Uuid>,
    extracted: u64,
}

impl<'d> Extraction<'d> {
    fn new(drive: &'d Drive, owner: &'d OwnerId, root: Node) -> Self {
        Self {
            drive,
            owner,
            undo: vec![Undo::Node(root.id)],
            created_nodes: vec![root.clone()],
            created_paths: Vec::new(),
            folders: HashMap::new(),
            extracted: 0,
            root,
        }
    }

    async fn run(
        &mut self,
        archive: ZipArchive<File>,
        entries: Vec<PlannedEntry>,
    ) -> Result<(), DriveError> {
        let file_indices = entries
            .iter()
            .filter(|e| matches!(e.plan, EntryPlan::File(_)))
            .map(|e| e.index)
            .collect();
        let per_entry_limit = self.drive.limits.max_extracted_bytes.saturating_add(1);
        let bodies = reader::spawn_reader(archive, file_indices, per_entry_limit);

        for entry in entries {
            match entry.plan {
                EntryPlan::Skip => continue,
                EntryPlan::Folder(segments) => {
                    self.ensure_folders(&segments).await?;
                }
                EntryPlan::File(segments) => {
                    let Some((name, dirs)) = segments.split_last() else {
                        continue;
                    };
                    let parent = self.ensure_folders(dirs).await?;
                    let body = bodies.recv_async().await.map_err(|_| {
                        DriveError::Internal("archive reader stopped early".to_string())
                    })?;
                    if body.index != entry.index {
                        return Err(DriveError::Internal(format!(
                            "archive reader out of step at entry {}",
                            entry.index
                        )));
                    }
                    self.extract_file(parent, name, &segments.join("/"), body)
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Make sure a folder exists for every prefix of `segments`, returning
    /// the id of the deepest one (the root when `segments` is empty).
    async fn ensure_folders(&mut self, segments: &[String]) -> Result<Uuid, DriveError> {
        let mut parent = self.root.id;
        let mut key = String::new();

        for segment in segments {
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(segment);

            if let Some(id) = self.folders.get(&key) {
                parent = *id;
                continue;
            }

            let folder = self
                .drive
                .nodes
                .create(NewNode::folder(self.owner, Some(parent), segment.as_str()))
                .await?;
            self.undo.push(Undo::Node(folder.id));
            self.folders.insert(key.clone(), folder.id);
            parent = folder.id;
            self.created_nodes.push(folder);
        }
        Ok(parent)
    }

    async fn extract_file(
        &mut self,
        parent: Uuid,
        name: &str,
        entry_path: &str,
        body: EntryBody,
    ) -> Result<(), DriveError> {
        let limit = self.drive.limits.max_extracted_bytes;
        let remaining = limit.saturating_sub(self.extracted);
        let relative = format!("{}/{entry_path}", self.root.id);

        let mut head = Vec::with_capacity(mime::SNIFF_LEN);
        let content = body
            .chunks
            .into_stream()
            .inspect(|chunk| {
                if let Ok(bytes) = chunk {
                    mime::fill_head(&mut head, bytes);
                }
            })
            .boxed();

        let saved = match self
            .drive
            .blobs
            .save_from_stream(self.owner, &relative, content, remaining)
            .await
        {
            Ok(saved) => saved,
            Err(BlobError::TooLarge { .. }) => {
                return Err(ArchiveViolation::ExtractTooLarge { limit }.into())
            }
            Err(e) => return Err(e.into()),
        };
        self.undo.push(Undo::Blob(saved.path.clone()));
        self.created_paths.push(saved.path.clone());

        self.extracted += saved.size;
        if self.extracted > limit {
            return Err(ArchiveViolation::ExtractTooLarge { limit }.into());
        }

        let content_type = mime::detect(&head, name);
        let node = self
            .drive
            .nodes
            .create(NewNode::file(
                self.owner,
                Some(parent),
                name,
                saved.size,
                content_type,
                saved.path,
            ))
            .await?;
        tracing::debug!(node_id = %node.id, entry = %entry_path, size = node.size, "extracted entry");
        self.undo.push(Undo::Node(node.id));
        self.created_nodes.push(node);
        Ok(())
    }

    /// Undo everything in reverse creation order. Each step is best-effort.
    async fn rollback(self) {
        for step in self.undo.into_iter().rev() {
            match step {
                Undo::Blob(path) => {
                    if let Err(e) = self.drive.blobs.delete(&path).await {
                        tracing::warn!(path = %path, error = %e, "rollback: failed to delete blob");
                    }
                }
                Undo::Node(id) => match self.drive.nodes.delete(id).await {
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(node_id = %id, error = %e, "rollback: failed to delete node")
                    }
                },
            }
        }
    }

    fn into_report(self) -> ExtractReport {
        ExtractReport {
            created_count: self.created_nodes.len(),
            created_nodes: self.created_nodes,
            created_paths: self.created_paths,
            root_id: self.root.id,
            completed_at: Utc::now(),
        }
    }
}
