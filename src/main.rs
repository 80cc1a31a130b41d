mod cli;

use crate::cli::{Cli, Command};
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config, store_dir } => cli::run::run(config, store_dir).await,
        Command::Inspect { file } => cli::tools::inspect(&file),
        Command::Migrate { legacy, out } => cli::tools::migrate(&legacy, out.as_deref()).map(|_| ()),
    }
}
