pub mod run;
pub mod tools;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "simstore")]
#[command(about = "Durable snapshots for a simulated region")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load a region, keep it saved on a timer, and accept operator commands
    Run {
        /// TOML file with [FileBasedSimulationData] and [Startup] sections
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overrides StoreBackupDirectory
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },
    /// Print what a snapshot file contains
    Inspect { file: PathBuf },
    /// Convert a legacy archive into the current snapshot format
    Migrate {
        legacy: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
