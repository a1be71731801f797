//! apigraph CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "apigraph")]
#[command(about = "API surface snapshots and compatibility checks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Run configuration (defaults to ./apigraph.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the configured surfaces and their variants
    Surfaces,
    /// Write a snapshot of the emitted API of a codebase document
    Snapshot {
        /// Codebase document to read
        input: PathBuf,
        /// Where to write the snapshot document
        output: PathBuf,
    },
    /// Check a current codebase against a released one
    Compare {
        /// Released codebase document
        old: PathBuf,
        /// Current codebase document
        new: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build the API level history of a series of codebase documents
    History {
        /// Versions as NAME=FILE, oldest first
        #[arg(required = true)]
        versions: Vec<String>,
        /// Drop supertypes missing from every version instead of failing
        #[arg(long)]
        remove_missing_classes: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("apigraph={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("apigraph v{}", env!("CARGO_PKG_VERSION"));
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Surfaces => commands::surfaces(&config),
        Commands::Snapshot { input, output } => commands::snapshot(&config, &input, &output),
        Commands::Compare { old, new, json } => commands::compare(&config, &old, &new, json),
        Commands::History {
            versions,
            remove_missing_classes,
        } => commands::history(&config, &versions, remove_missing_classes),
    }
}
