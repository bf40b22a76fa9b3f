use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use super::error::ErrorKind;
use super::node::OwnerId;
use super::store::BoxError;

/// A fallible stream of content chunks.
pub type ByteStream<'a> = BoxStream<'a, std::io::Result<Bytes>>;

/// Where a blob ended up and how many bytes were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedBlob {
    pub path: String,
    pub size: u64,
}

/// Content handed over by a client, together with the name it was sent as.
pub struct FileUpload<'a> {
    pub file_name: String,
    pub content: ByteStream<'a>,
}

impl<'a> FileUpload<'a> {
    pub fn new(file_name: impl Into<String>, content: ByteStream<'a>) -> Self {
        Self {
            file_name: file_name.into(),
            content,
        }
    }
}

impl std::fmt::Debug for FileUpload<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("invalid blob path: {0}")]
    InvalidPath(String),
    #[error("content exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("content stream failed: {0}")]
    Stream(#[source] std::io::Error),
    #[error("blob backend: {0}")]
    Backend(#[source] BoxError),
}

impl BlobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlobError::InvalidPath(_) | BlobError::Stream(_) => ErrorKind::InvalidInput,
            BlobError::TooLarge { .. } => ErrorKind::ResourceExhausted,
            BlobError::NotFound(_) => ErrorKind::NotFound,
            BlobError::Backend(_) => ErrorKind::StoreFailure,
        }
    }
}

/// Owner-namespaced byte storage.
///
/// Relative paths are resolved under the owner's namespace and may never
/// escape it. Writes are streamed and bounded: exceeding the cap fails with
/// [`BlobError::TooLarge`] and leaves nothing behind.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Stream `content` to `relative_path` inside the owner's namespace,
    /// refusing more than `max_size` bytes.
    async fn save_from_stream(
        &self,
        owner: &OwnerId,
        relative_path: &str,
        content: ByteStream<'_>,
        max_size: u64,
    ) -> Result<SavedBlob, BlobError>;

    /// Store a plain upload under a collision-free generated name, capped at
    /// the configured single-upload size.
    async fn save_simple(
        &self,
        owner: &OwnerId,
        upload: FileUpload<'_>,
    ) -> Result<SavedBlob, BlobError>;

    async fn open(&self, path: &str) -> Result<ByteStream<'static>, BlobError>;

    /// Size of the blob at `path`, `None` if it does not exist.
    async fn stat(&self, path: &str) -> Result<Option<u64>, BlobError>;

    async fn delete(&self, path: &str) -> Result<(), BlobError>;
}

/// Reduce a client-supplied file name to a single safe path segment.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .find(|s| !s.trim().is_empty())
        .unwrap_or("")
        .trim();
    match base {
        "" | "." | ".." => "file".to_string(),
        other => other.to_string(),
    }
}
