//! haa4b CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod listing;
mod reader;
mod run;

#[derive(Parser)]
#[command(name = "haa4b")]
#[command(about = "haa4b - event selection and control histograms for h -> aa -> 4b")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select events and fill histograms
    Run {
        /// Run config (YAML, or JSON by extension)
        #[arg(short, long)]
        config: PathBuf,

        /// First entry (overrides `ev_start`)
        #[arg(long)]
        start: Option<i64>,

        /// One past the last entry, negative for all (overrides `ev_end`)
        #[arg(long, allow_hyphen_values = true)]
        end: Option<i64>,
    },

    /// Check a run config and decode its input without writing outputs
    Validate {
        /// Run config (YAML, or JSON by extension)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Run { config, .. } | Commands::Validate { config } => config,
    };
    let cfg = config::read_run_config(config_path)?;

    let level = if cfg.verbose { cli.log_level.max(tracing::Level::DEBUG) } else { cli.log_level };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { start, end, .. } => run::cmd_run(cfg, start, end),
        Commands::Validate { .. } => run::cmd_validate(cfg),
    }
}
