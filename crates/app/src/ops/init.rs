use clap::Args;

use ecloud::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// API server listen port
    #[arg(long, default_value_t = 8080)]
    pub api_port: u16,

    /// Static bearer token for an owner, as TOKEN=OWNER (repeatable)
    #[arg(long = "token", value_parser = parse_token)]
    pub tokens: Vec<(String, String)>,
}

fn parse_token(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((token, owner)) if !token.is_empty() && !owner.is_empty() => {
            Ok((token.to_string(), owner.to_string()))
        }
        _ => Err(format!("expected TOKEN=OWNER, got '{}'", s)),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] ecloud::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            api_port: self.api_port,
            tokens: self.tokens.iter().cloned().collect(),
            ..AppConfig::default()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let output = format!(
            "Initialized ecloud directory at: {}\n\
             - Database: {}\n\
             - Blobs: {}\n\
             - Config: {}\n\
             - API port: {}\n\
             - Tokens: {}",
            state.state_dir.display(),
            state.db_path.display(),
            state.blobs_path.display(),
            state.config_path.display(),
            state.config.api_port,
            state.config.tokens.len()
        );

        Ok(output)
    }
}
