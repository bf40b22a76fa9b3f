//! Error types for the node database and blob storage.

/// Errors that can occur when working with the backend.
#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Path is empty, escapes its owner namespace, or is otherwise malformed
    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    /// Content stream exceeded the size cap; nothing was persisted
    #[error("content exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    /// The source stream failed while being copied into storage
    #[error("content stream failed: {0}")]
    Stream(#[source] std::io::Error),

    /// Blob not found
    #[error("blob not found: {0}")]
    NotFound(String),

    /// A stored row could not be decoded
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// S3 bucket not found - must be created before use
    #[error("S3 bucket '{0}' does not exist. Create it before starting the service.")]
    BucketNotFound(String),
}

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, BlobStoreError>;
