//! Shared test utilities for drive integration tests
#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use parking_lot::Mutex;

use ::common::drive::{
    BlobError, BlobStore, ByteStream, Drive, DriveLimits, FileUpload, MemoryNodeStore, NewNode,
    Node, NodeStore, NodeStoreError, ObjectBlobStore, OwnerId, SavedBlob,
};
use uuid::Uuid;

/// Blob store wrapper that remembers which blobs currently exist and can be
/// told to fail after a number of successful writes.
#[derive(Debug)]
pub struct TrackingBlobs {
    inner: ObjectBlobStore,
    live: Mutex<HashSet<String>>,
    fail_after: Option<usize>,
    saves: AtomicUsize,
}

impl TrackingBlobs {
    pub fn new(max_upload_bytes: u64, fail_after: Option<usize>) -> Self {
        Self {
            inner: ObjectBlobStore::memory(max_upload_bytes),
            live: Mutex::new(HashSet::new()),
            fail_after,
            saves: AtomicUsize::new(0),
        }
    }

    pub fn live(&self) -> HashSet<String> {
        self.live.lock().clone()
    }

    fn check_budget(&self) -> Result<(), BlobError> {
        let done = self.saves.fetch_add(1, Ordering::SeqCst);
        match self.fail_after {
            Some(limit) if done >= limit => Err(BlobError::Backend("injected failure".into())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl BlobStore for TrackingBlobs {
    async fn save_from_stream(
        &self,
        owner: &OwnerId,
        relative_path: &str,
        content: ByteStream<'_>,
        max_size: u64,
    ) -> Result<SavedBlob, BlobError> {
        self.check_budget()?;
        let saved = self
            .inner
            .save_from_stream(owner, relative_path, content, max_size)
            .await?;
        self.live.lock().insert(saved.path.clone());
        Ok(saved)
    }

    async fn save_simple(
        &self,
        owner: &OwnerId,
        upload: FileUpload<'_>,
    ) -> Result<SavedBlob, BlobError> {
        self.check_budget()?;
        let saved = self.inner.save_simple(owner, upload).await?;
        self.live.lock().insert(saved.path.clone());
        Ok(saved)
    }

    async fn open(&self, path: &str) -> Result<ByteStream<'static>, BlobError> {
        self.inner.open(path).await
    }

    async fn stat(&self, path: &str) -> Result<Option<u64>, BlobError> {
        self.inner.stat(path).await
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        self.inner.delete(path).await?;
        self.live.lock().remove(path);
        Ok(())
    }
}

/// Node store wrapper whose `create` starts failing after a number of
/// successful inserts.
#[derive(Debug)]
pub struct FlakyNodes {
    inner: MemoryNodeStore,
    fail_after: usize,
    creates: AtomicUsize,
}

impl FlakyNodes {
    pub fn new(inner: MemoryNodeStore, fail_after: usize) -> Self {
        Self {
            inner,
            fail_after,
            creates: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl NodeStore for FlakyNodes {
    async fn create(&self, node: NewNode) -> Result<Node, NodeStoreError> {
        if self.creates.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
            return Err(NodeStoreError::backend("injected failure"));
        }
        self.inner.create(node).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Node>, NodeStoreError> {
        self.inner.find_by_id(id).await
    }

    async fn list_children(
        &self,
        owner: &OwnerId,
        parent: Option<Uuid>,
    ) -> Result<Vec<Node>, NodeStoreError> {
        self.inner.list_children(owner, parent).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, NodeStoreError> {
        self.inner.delete(id).await
    }

    async fn update_parent(
        &self,
        owner: &OwnerId,
        id: Uuid,
        new_parent: Option<Uuid>,
    ) -> Result<(), NodeStoreError> {
        self.inner.update_parent(owner, id, new_parent).await
    }
}

pub struct TestEnv {
    pub drive: Drive,
    pub nodes: MemoryNodeStore,
    pub blobs: Arc<TrackingBlobs>,
    pub owner: OwnerId,
}

/// Set up a drive over in-memory stores with default limits
pub async fn setup_test_env() -> TestEnv {
    setup_with(DriveLimits::default(), None).await
}

/// Set up a drive with custom limits, optionally failing blob writes after
/// `fail_after` successes
pub async fn setup_with(limits: DriveLimits, fail_after: Option<usize>) -> TestEnv {
    let nodes = MemoryNodeStore::new();
    let blobs = Arc::new(TrackingBlobs::new(limits.max_upload_bytes, fail_after));
    let drive = Drive::new(Arc::new(nodes.clone()), blobs.clone(), limits);

    TestEnv {
        drive,
        nodes,
        blobs,
        owner: OwnerId::new("alice"),
    }
}

/// Set up a drive whose node store fails every insert after the first
/// `fail_after`
pub async fn setup_with_flaky_nodes(fail_after: usize) -> TestEnv {
    let limits = DriveLimits::default();
    let nodes = MemoryNodeStore::new();
    let blobs = Arc::new(TrackingBlobs::new(limits.max_upload_bytes, None));
    let flaky = FlakyNodes::new(nodes.clone(), fail_after);
    let drive = Drive::new(Arc::new(flaky), blobs.clone(), limits);

    TestEnv {
        drive,
        nodes,
        blobs,
        owner: OwnerId::new("alice"),
    }
}

/// Stream `data` in small chunks so multi-chunk paths get exercised.
pub fn byte_stream(data: &[u8]) -> ByteStream<'static> {
    let chunks: Vec<std::io::Result<Bytes>> = data
        .chunks(7)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    stream::iter(chunks).boxed()
}

pub fn upload(name: &str, data: &[u8]) -> FileUpload<'static> {
    FileUpload::new(name, byte_stream(data))
}

pub async fn read_all(stream: ByteStream<'_>) -> Vec<u8> {
    let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
    chunks.concat()
}

/// Build a zip in memory. Names ending in `/` become directory entries.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Build a zip with one regular file and one symlink entry.
pub fn zip_with_symlink() -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    writer.start_file("real.txt", options).unwrap();
    writer.write_all(b"real").unwrap();
    writer
        .add_symlink("link.txt", "/etc/passwd", options)
        .unwrap();
    writer.finish().unwrap().into_inner()
}
