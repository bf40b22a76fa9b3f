use std::collections::BTreeMap;
use std::{fs, path::PathBuf};

use common::prelude::DriveLimits;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "ecloud";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "db.sqlite";
pub const BLOBS_DIR_NAME: &str = "blobs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the API server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Default log level, `RUST_LOG` still takes precedence
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for rolling log files (stdout only if not set)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Where blob content is kept
    #[serde(default)]
    pub blob_store: BlobStoreConfig,
    /// Upload and archive caps
    #[serde(default)]
    pub limits: DriveLimits,
    /// Bearer token -> owner id
    #[serde(default)]
    pub tokens: BTreeMap<String, String>,
}

fn default_api_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            log_level: default_log_level(),
            log_dir: None,
            blob_store: BlobStoreConfig::default(),
            limits: DriveLimits::default(),
            tokens: BTreeMap::new(),
        }
    }
}

/// Configuration for the blob storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlobStoreConfig {
    /// Local filesystem, the default
    #[default]
    Filesystem,

    /// Blobs are kept in memory and lost on restart
    Memory,

    /// S3-compatible object storage
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Bucket name
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.ecloud)
    pub state_dir: PathBuf,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Path to the blobs directory
    pub blobs_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.ecloud)
    pub fn state_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let state_dir = Self::state_dir(custom_path)?;

        if state_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&state_dir)?;

        let blobs_path = state_dir.join(BLOBS_DIR_NAME);
        fs::create_dir_all(&blobs_path)?;

        let config = config.unwrap_or_default();
        let config_path = state_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        // the service runs migrations on first start
        let db_path = state_dir.join(DB_FILE_NAME);
        fs::write(&db_path, "")?;

        Ok(Self {
            state_dir,
            db_path,
            blobs_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let state_dir = Self::state_dir(custom_path)?;

        if !state_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let db_path = state_dir.join(DB_FILE_NAME);
        let blobs_path = state_dir.join(BLOBS_DIR_NAME);
        let config_path = state_dir.join(CONFIG_FILE_NAME);

        if !db_path.exists() {
            return Err(StateError::MissingFile(DB_FILE_NAME.to_string()));
        }
        if !blobs_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", BLOBS_DIR_NAME)));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            state_dir,
            db_path,
            blobs_path,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("ecloud directory not initialized. Run 'ecloud init' first")]
    NotInitialized,

    #[error("ecloud directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state");

        let mut config = AppConfig::default();
        config.tokens.insert("t0k3n".to_string(), "alice".to_string());
        let state = AppState::init(Some(path.clone()), Some(config)).unwrap();
        assert!(state.blobs_path.is_dir());
        assert!(state.db_path.exists());

        let loaded = AppState::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.config.api_port, 8080);
        assert_eq!(loaded.config.tokens.get("t0k3n").map(String::as_str), Some("alice"));
        assert!(matches!(loaded.config.blob_store, BlobStoreConfig::Filesystem));

        assert!(matches!(
            AppState::init(Some(path), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_requires_init() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            AppState::load(Some(dir.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            api_port = 9000

            [blob_store]
            type = "memory"

            [limits]
            max_archive_entries = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.api_port, 9000);
        assert_eq!(config.log_level, "info");
        assert!(matches!(config.blob_store, BlobStoreConfig::Memory));
        assert_eq!(config.limits.max_archive_entries, 10);
        assert_eq!(config.limits.max_upload_bytes, DriveLimits::default().max_upload_bytes);
        assert!(config.tokens.is_empty());
    }
}
