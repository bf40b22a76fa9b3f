use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

/// Resource bounds applied to uploads and archive extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveLimits {
    /// Largest archive accepted for extraction
    pub max_archive_bytes: u64,
    /// Most entries an archive may list, skipped ones included
    pub max_archive_entries: usize,
    /// Total decompressed bytes one extraction may write
    pub max_extracted_bytes: u64,
    /// Longest normalized entry path, in bytes
    pub max_entry_path_len: usize,
    /// Longest single path segment, in bytes
    pub max_segment_len: usize,
    /// Deepest entry nesting, counted in path segments
    pub max_depth: usize,
    /// Largest single-file upload
    pub max_upload_bytes: u64,
}

impl Default for DriveLimits {
    fn default() -> Self {
        Self {
            max_archive_bytes: 200 * MIB,
            max_archive_entries: 5000,
            max_extracted_bytes: 1024 * MIB,
            max_entry_path_len: 4096,
            max_segment_len: 255,
            max_depth: 1000,
            max_upload_bytes: 100 * MIB,
        }
    }
}
