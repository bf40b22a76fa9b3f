//! Entry classification, done for the whole archive before anything is
//! written.

use std::collections::HashSet;
use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::drive::{ArchiveViolation, DriveLimits};

/// `S_IFMT` / `S_IFLNK` from the unix mode stored in the external attributes.
const FILE_TYPE_MASK: u32 = 0o170000;
const SYMLINK_TYPE: u32 = 0o120000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EntryPlan {
    Skip,
    Folder(Vec<String>),
    File(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlannedEntry {
    pub index: usize,
    pub plan: EntryPlan,
}

/// Classify a single entry by its raw name.
pub(crate) fn plan_entry(
    raw_name: &str,
    is_dir: bool,
    is_symlink: bool,
    limits: &DriveLimits,
) -> Result<EntryPlan, ArchiveViolation> {
    if raw_name.is_empty() {
        return Ok(EntryPlan::Skip);
    }

    let name = raw_name.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(ArchiveViolation::Traversal(raw_name.to_string())),
            s => segments.push(s.to_string()),
        }
    }
    if segments.is_empty() {
        return Ok(EntryPlan::Skip);
    }

    let clean_len = segments.iter().map(String::len).sum::<usize>() + segments.len() - 1;
    if clean_len > limits.max_entry_path_len {
        return Err(ArchiveViolation::PathTooLong {
            len: clean_len,
            limit: limits.max_entry_path_len,
        });
    }
    if let Some(long) = segments.iter().find(|s| s.len() > limits.max_segment_len) {
        return Err(ArchiveViolation::SegmentTooLong {
            len: long.len(),
            limit: limits.max_segment_len,
        });
    }
    if segments.len() > limits.max_depth {
        return Err(ArchiveViolation::TooDeep {
            depth: segments.len(),
            limit: limits.max_depth,
        });
    }

    if is_dir || name.ends_with('/') {
        return Ok(EntryPlan::Folder(segments));
    }
    if is_symlink {
        return Ok(EntryPlan::Skip);
    }
    Ok(EntryPlan::File(segments))
}

/// Check the entry count and classify every entry in central-directory order.
pub(crate) fn plan_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    limits: &DriveLimits,
) -> Result<Vec<PlannedEntry>, ArchiveViolation> {
    let count = archive.len();
    if count > limits.max_archive_entries {
        return Err(ArchiveViolation::TooManyEntries {
            count,
            limit: limits.max_archive_entries,
        });
    }

    let mut planned = Vec::with_capacity(count);
    for index in 0..count {
        let entry = archive
            .by_index_raw(index)
            .map_err(|e| ArchiveViolation::Malformed(e.to_string()))?;
        let is_symlink = entry
            .unix_mode()
            .is_some_and(|mode| mode & FILE_TYPE_MASK == SYMLINK_TYPE);
        let plan = plan_entry(entry.name(), entry.is_dir(), is_symlink, limits)?;
        planned.push(PlannedEntry { index, plan });
    }
    check_conflicts(&planned)?;
    Ok(planned)
}

/// Every file entry must own its path: no other file may normalize to the
/// same path, and no folder may live there.
fn check_conflicts(planned: &[PlannedEntry]) -> Result<(), ArchiveViolation> {
    let mut files = HashSet::new();
    let mut folders = HashSet::new();

    for entry in planned {
        let (segments, dirs) = match &entry.plan {
            EntryPlan::Skip => continue,
            EntryPlan::Folder(segments) => (segments, segments.len()),
            EntryPlan::File(segments) => {
                let path = segments.join("/");
                if !files.insert(path.clone()) {
                    return Err(ArchiveViolation::PathConflict(path));
                }
                (segments, segments.len() - 1)
            }
        };
        for depth in 1..=dirs {
            folders.insert(segments[..depth].join("/"));
        }
    }

    match files.iter().find(|path| folders.contains(*path)) {
        Some(path) => Err(ArchiveViolation::PathConflict(path.clone())),
        None => Ok(()),
    }
}
