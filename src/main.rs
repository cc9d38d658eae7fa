//! `reloadable` command-line entry point.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use reloadable::constants;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "reloadable", version, about = "Run and check hot-reloadable services")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a service and reload it whenever its resources change
    Watch {
        /// Service file
        #[arg(default_value = constants::DEFAULT_SERVICE_FILE)]
        config: PathBuf,
        /// Override the poll interval from the service file (milliseconds)
        #[arg(long)]
        poll_interval_ms: Option<u64>,
        /// Emit JSON logs and print the reload status as JSON after every swap
        #[arg(long)]
        json: bool,
    },
    /// Validate a service file without starting it
    Validate {
        /// Service file
        #[arg(default_value = constants::DEFAULT_SERVICE_FILE)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            config,
            poll_interval_ms,
            json,
        } => commands::watch::execute(&config, poll_interval_ms, json).await,
        Commands::Validate { config } => commands::validate::execute(&config),
    }
}
