use serde::Serialize;
use uuid::Uuid;

use super::blobs::BlobError;
use super::store::NodeStoreError;

/// Coarse failure categories. Transports map these onto their own status
/// codes; the engine never talks HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidInput,
    ResourceExhausted,
    StoreFailure,
    PartialFailureRecovered,
}

/// Ways an uploaded archive can be refused.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveViolation {
    #[error("zip too large (limit {limit} bytes)")]
    ArchiveTooLarge { limit: u64 },
    #[error("zip upload is empty")]
    Empty,
    #[error("invalid zip: {0}")]
    Malformed(String),
    #[error("too many entries in zip ({count} > {limit})")]
    TooManyEntries { count: usize, limit: usize },
    #[error("zip extracts to more than {limit} bytes")]
    ExtractTooLarge { limit: u64 },
    #[error("zip contains invalid path segments: {0}")]
    Traversal(String),
    #[error("entry path too long ({len} > {limit} bytes)")]
    PathTooLong { len: usize, limit: usize },
    #[error("filename component too long ({len} > {limit} bytes)")]
    SegmentTooLong { len: usize, limit: usize },
    #[error("entry nested too deep ({depth} > {limit})")]
    TooDeep { depth: usize, limit: usize },
    #[error("zip contains more than one entry for {0}")]
    PathConflict(String),
}

impl ArchiveViolation {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveViolation::ArchiveTooLarge { .. }
            | ArchiveViolation::TooManyEntries { .. }
            | ArchiveViolation::ExtractTooLarge { .. }
            | ArchiveViolation::TooDeep { .. } => ErrorKind::ResourceExhausted,
            ArchiveViolation::Empty
            | ArchiveViolation::Malformed(_)
            | ArchiveViolation::Traversal(_)
            | ArchiveViolation::PathTooLong { .. }
            | ArchiveViolation::SegmentTooLong { .. }
            | ArchiveViolation::PathConflict(_) => ErrorKind::InvalidInput,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("node {0} belongs to another owner")]
    Forbidden(Uuid),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("cannot move folder {node} into itself or its descendant {target}")]
    MoveIntoDescendant { node: Uuid, target: Uuid },
    #[error("failed to read uploaded content: {0}")]
    Content(#[source] std::io::Error),
    #[error(transparent)]
    Archive(#[from] ArchiveViolation),
    #[error("node store error: {0}")]
    NodeStore(#[from] NodeStoreError),
    #[error("blob store error: {0}")]
    BlobStore(#[from] BlobError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("extraction failed and was rolled back: {0}")]
    RolledBack(#[source] Box<DriveError>),
}

impl DriveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriveError::NotFound(_) => ErrorKind::NotFound,
            DriveError::Forbidden(_) => ErrorKind::Forbidden,
            DriveError::InvalidInput(_)
            | DriveError::MoveIntoDescendant { .. }
            | DriveError::Content(_) => ErrorKind::InvalidInput,
            DriveError::Archive(v) => v.kind(),
            DriveError::NodeStore(e) => e.kind(),
            DriveError::BlobStore(e) => e.kind(),
            DriveError::Io(_) | DriveError::Internal(_) => ErrorKind::StoreFailure,
            DriveError::RolledBack(_) => ErrorKind::PartialFailureRecovered,
        }
    }

    /// The category of the failure that triggered a rollback, or of the
    /// error itself when nothing was rolled back.
    pub fn root_kind(&self) -> ErrorKind {
        match self {
            DriveError::RolledBack(cause) => cause.root_kind(),
            other => other.kind(),
        }
    }

    pub fn was_rolled_back(&self) -> bool {
        matches!(self, DriveError::RolledBack(_))
    }
}
