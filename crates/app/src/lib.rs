// Library exports for the binary and for integration tests

// Daemon/service modules (HTTP server, stores, identity)
pub mod daemon;
pub mod state;

// Re-export key types for convenience
pub use daemon::http_server;
pub use daemon::spawn_service;
pub use daemon::ServiceConfig;
pub use daemon::ServiceState;
pub use state::{AppConfig, AppState, BlobStoreConfig, StateError};
