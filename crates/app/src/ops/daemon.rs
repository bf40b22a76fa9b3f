use clap::{Args, ValueEnum};

use ecloud::daemon::{spawn_service, ServiceConfig};
use ecloud::state::{AppState, BlobStoreConfig};

/// Blob store backend override for the CLI
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BlobStoreType {
    /// Local filesystem under the state directory
    Filesystem,
    /// In memory, lost on restart
    Memory,
    /// S3-compatible object storage
    S3,
}

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override the API port from config.toml
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Override the log level from config.toml
    #[arg(long)]
    pub log_level: Option<tracing::Level>,

    // Blob store configuration
    /// Blob store backend type (defaults to config.toml)
    #[arg(long, value_enum)]
    pub blob_store: Option<BlobStoreType>,

    /// S3 endpoint URL (required for --blob-store s3)
    #[arg(long, env = "ECLOUD_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// S3 bucket name (required for --blob-store s3)
    #[arg(long, env = "ECLOUD_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// S3 access key
    #[arg(long, env = "ECLOUD_S3_ACCESS_KEY")]
    pub s3_access_key: Option<String>,

    /// S3 secret key
    #[arg(long, env = "ECLOUD_S3_SECRET_KEY")]
    pub s3_secret_key: Option<String>,

    /// S3 region (optional, defaults to us-east-1)
    #[arg(long, env = "ECLOUD_S3_REGION")]
    pub s3_region: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] ecloud::state::StateError),

    #[error("invalid log level in config: {0}")]
    InvalidLogLevel(String),

    #[error("missing required S3 configuration: {0}")]
    MissingS3Config(String),
}

impl Daemon {
    /// Blob store from CLI flags, falling back to the configured one
    fn build_blob_store_config(
        &self,
        configured: &BlobStoreConfig,
    ) -> Result<BlobStoreConfig, DaemonError> {
        let Some(kind) = self.blob_store else {
            return Ok(configured.clone());
        };

        match kind {
            BlobStoreType::Filesystem => Ok(BlobStoreConfig::Filesystem),
            BlobStoreType::Memory => Ok(BlobStoreConfig::Memory),
            BlobStoreType::S3 => {
                let endpoint = self
                    .s3_endpoint
                    .clone()
                    .ok_or_else(|| DaemonError::MissingS3Config("--s3-endpoint".to_string()))?;
                let bucket = self
                    .s3_bucket
                    .clone()
                    .ok_or_else(|| DaemonError::MissingS3Config("--s3-bucket".to_string()))?;
                let access_key = self.s3_access_key.clone().ok_or_else(|| {
                    DaemonError::MissingS3Config(
                        "--s3-access-key or ECLOUD_S3_ACCESS_KEY".to_string(),
                    )
                })?;
                let secret_key = self.s3_secret_key.clone().ok_or_else(|| {
                    DaemonError::MissingS3Config(
                        "--s3-secret-key or ECLOUD_S3_SECRET_KEY".to_string(),
                    )
                })?;

                Ok(BlobStoreConfig::S3 {
                    endpoint,
                    access_key,
                    secret_key,
                    bucket,
                    region: self.s3_region.clone(),
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;

        let log_level = match self.log_level {
            Some(level) => level,
            None => state
                .config
                .log_level
                .parse()
                .map_err(|_| DaemonError::InvalidLogLevel(state.config.log_level.clone()))?,
        };
        let blob_store = self.build_blob_store_config(&state.config.blob_store)?;

        let config = ServiceConfig {
            api_port: self.api_port.unwrap_or(state.config.api_port),
            blob_store,
            blobs_path: Some(state.blobs_path),
            sqlite_path: Some(state.db_path),
            limits: state.config.limits,
            tokens: state.config.tokens,
            log_level,
            log_dir: state.config.log_dir,
        };

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
