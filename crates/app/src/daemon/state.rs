use std::sync::Arc;

use common::drive::{Drive, ObjectBlobStore, SqliteNodeStore};
use object_store::{BlobStorage, BlobStoreError, NodeDatabase, ObjectStoreConfig};

use super::config::Config;
use super::identity::{IdentityProvider, StaticTokens};
use crate::state::BlobStoreConfig;

/// Main service state, shared by every request handler
#[derive(Clone)]
pub struct State {
    drive: Drive,
    identity: Arc<dyn IdentityProvider>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("drive", &self.drive)
            .finish_non_exhaustive()
    }
}

fn object_store_config(config: &Config) -> Result<ObjectStoreConfig, StateSetupError> {
    match &config.blob_store {
        BlobStoreConfig::Filesystem => {
            let path = config
                .blobs_path
                .clone()
                .ok_or(StateSetupError::MissingBlobsPath)?;
            tracing::info!(path = %path.display(), "Using filesystem blob store");
            Ok(ObjectStoreConfig::Local { path })
        }
        BlobStoreConfig::Memory => {
            tracing::warn!("Using in-memory blob store, content is lost on restart");
            Ok(ObjectStoreConfig::Memory)
        }
        BlobStoreConfig::S3 {
            endpoint,
            access_key,
            secret_key,
            bucket,
            region,
        } => {
            tracing::info!(endpoint = %endpoint, bucket = %bucket, "Using S3 blob store");
            Ok(ObjectStoreConfig::S3 {
                endpoint: endpoint.clone(),
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
                bucket: bucket.clone(),
                region: region.clone(),
            })
        }
    }
}

impl State {
    pub fn new(drive: Drive, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { drive, identity }
    }

    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        // 1. Setup node database
        let database = match config.sqlite_path {
            Some(ref path) => {
                if !path.exists() {
                    return Err(StateSetupError::DatabasePathDoesNotExist);
                }
                tracing::info!(path = %path.display(), "Opening node database");
                NodeDatabase::new(path).await?
            }
            None => {
                tracing::info!("Using in-memory node database");
                NodeDatabase::in_memory().await?
            }
        };

        // 2. Setup blob storage
        let storage = BlobStorage::new(object_store_config(config)?).await?;

        // 3. Wire up the drive
        let drive = Drive::new(
            Arc::new(SqliteNodeStore::new(database)),
            Arc::new(ObjectBlobStore::new(storage, config.limits.max_upload_bytes)),
            config.limits.clone(),
        );

        if config.tokens.is_empty() {
            tracing::warn!("No API tokens configured, every request will be rejected");
        }
        let identity = Arc::new(StaticTokens::new(config.tokens.clone()));

        Ok(Self::new(drive, identity))
    }

    pub fn drive(&self) -> &Drive {
        &self.drive
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Database path does not exist")]
    DatabasePathDoesNotExist,
    #[error("filesystem blob store needs a blobs directory")]
    MissingBlobsPath,
    #[error("storage setup error: {0}")]
    Storage(#[from] BlobStoreError),
}
