use std::collections::BTreeMap;
use std::path::PathBuf;

use common::prelude::DriveLimits;

use crate::state::BlobStoreConfig;

#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    /// Port for the API server
    pub api_port: u16,

    // blob store configuration
    /// Blob storage backend configuration
    pub blob_store: BlobStoreConfig,
    /// Directory for the filesystem blob store
    pub blobs_path: Option<PathBuf>,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // drive configuration
    pub limits: DriveLimits,
    /// Bearer token -> owner id
    pub tokens: BTreeMap<String, String>,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}
