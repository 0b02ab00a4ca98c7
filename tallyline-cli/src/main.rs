//! Tallyline CLI - normalize exchange exports and API history into one ledger

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{demo, detect, import, mappings};

/// Tallyline - transaction imports in your terminal
#[derive(Parser)]
#[command(name = "tly", version, about, long_about = None)]
struct Cli {
    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import transactions from a CSV export
    Import(import::ImportArgs),

    /// Rank the known formats against a CSV file
    Detect {
        /// Path to CSV file
        file: std::path::PathBuf,
        /// Wallet service the file belongs to
        #[arg(long)]
        wallet_tag: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered CSV formats
    Mappings {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the demo API importer
    Demo {
        /// Drop transactions before this date
        #[arg(long)]
        start_date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tallyline=debug" } else { "tallyline=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import(args) => import::run(args),
        Commands::Detect { file, wallet_tag, json } => detect::run(&file, wallet_tag.as_deref(), json),
        Commands::Mappings { json } => mappings::run(json),
        Commands::Demo { start_date, json } => demo::run(start_date.as_deref(), json),
    }
}
