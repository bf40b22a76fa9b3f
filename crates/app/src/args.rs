pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ecloud")]
#[command(about = "Multi-tenant file drive with safe zip ingestion")]
pub struct Args {
    /// Path to the ecloud state directory (defaults to ~/.ecloud)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
