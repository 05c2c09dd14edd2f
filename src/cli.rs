//! Command-line parsing for vmidle

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vmidle")]
#[command(version)]
#[command(about = "Idleness scores for VMs from cumulative counter snapshots", long_about = None)]
pub struct Cli {
    /// Config file (overrides CONFIG_FILE)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Score every pending VM over the configured window and write the report (default)
    Analyze,
    /// Print the reconstructed interval series of every pending VM and exit
    Dump,
    /// Show first/last capture and the VMs in the store
    Info,
    /// Load JSON-lines snapshots ({"vm_id", "captured_at", "data"}) into the store
    Import {
        /// JSON-lines file
        file: PathBuf,
    },
    /// Delete snapshots older than database.retention_days and vacuum
    Prune,
}

impl Cli {
    /// The selected subcommand, `analyze` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Analyze)
    }
}
