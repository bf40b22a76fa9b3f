mod config;
pub mod http_server;
pub mod identity;
pub mod process;
mod state;

pub use config::Config as ServiceConfig;
pub use identity::{IdentityProvider, Owner, StaticTokens};
pub use process::spawn_service;
pub use state::{State as ServiceState, StateSetupError};
