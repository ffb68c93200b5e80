//! SagaStore CLI
//!
//! Command-line interface for inspecting and editing a SagaStore file

use clap::{Parser, Subcommand};
use sagastore_core::logging_facility::{init, Profile};
use sagastore_store::StoreConfig;
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "sagastore")]
#[command(about = "SagaStore - Saga and subscription storage in one SQLite file", long_about = None)]
struct Cli {
    /// Storage file
    #[arg(long, env = "SAGASTORE_DB", global = true, default_value = "sagastore.db")]
    db: PathBuf,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Topic subscriptions
    Topics(commands::topics::TopicsArgs),
    /// Saga lookups
    Sagas(commands::sagas::SagasArgs),
    /// List the partition catalog
    Partitions(commands::partitions::PartitionsArgs),
}

fn main() {
    let cli = Cli::parse();

    init(if cli.json_logs {
        Profile::Production
    } else {
        Profile::Development
    });

    let result = StoreConfig::new(&cli.db)
        .map_err(Box::<dyn std::error::Error>::from)
        .and_then(|config| {
            tracing::debug!(db = %config.path.display(), "opened store config");
            match cli.command {
                Commands::Topics(args) => commands::topics::execute(&config, args),
                Commands::Sagas(args) => commands::sagas::execute(&config, args),
                Commands::Partitions(args) => commands::partitions::execute(&config, args),
            }
        });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
