//! SRS CSI Tool
//! 
//! Offline companion of the SRS estimator: converts binary CSI logs, summarises
//! logging sessions and runs the estimator on synthetic sounding occasions.

mod config;
mod convert;
mod sessions;
mod simulate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use config::SimulationConfig;

/// SRS channel-state information tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a binary CSI log into CSV, one row per tone
    Bin2csv {
        /// Binary log file
        input: PathBuf,

        /// Output CSV file (defaults to the input with a .csv extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarise the sessions recorded in a metadata file
    Sessions {
        /// Path to session_metadata.jsonl
        metadata: PathBuf,

        /// Export the session list as JSON
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Run the SRS estimator on synthetic sounding occasions
    Simulate {
        /// Path to the scenario file
        #[arg(short, long, default_value = "sim.toml")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    match args.command {
        Command::Bin2csv { input, output } => {
            let output = output.unwrap_or_else(|| input.with_extension("csv"));
            info!("Converting {} to {}", input.display(), output.display());
            convert::run(&input, &output)
        }
        Command::Sessions { metadata, export } => sessions::run(&metadata, export.as_deref()),
        Command::Simulate { config } => {
            info!("Configuration file: {}", config.display());
            let config = SimulationConfig::from_file(&config)?;
            simulate::run(&config)
        }
    }
}
