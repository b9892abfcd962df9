use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod config;
mod logging;

use commands::{cycle::CycleArgs, dividends::DividendsArgs, fees::FeesArgs, tally::TallyArgs};
use config::ParcelConfig;

#[derive(Parser)]
#[command(name = "parcel")]
#[command(about = "Escrow distribution and governance tallying for tokenized properties")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "PARCEL_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split an escrow balance into management fee, platform fee and dividend pool
    Fees(FeesArgs),

    /// Split a dividend pool pro rata across token holders
    Dividends(DividendsArgs),

    /// Decide a proposal's outcome from its vote totals
    Tally(TallyArgs),

    /// Run a full deposit, distribute and confirm cycle from a scenario file
    Cycle(CycleArgs),

    /// Write the default configuration to a file
    InitConfig {
        /// Output path
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { output } = &cli.command {
        let path = output.clone().unwrap_or_else(config::default_config_path);
        ParcelConfig::default()
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} {}", "✓ Wrote default configuration to".green(), path.display());
        return Ok(());
    }

    let config = ParcelConfig::load(cli.config.as_deref())?;
    logging::init_logging(&config.log_config()?)?;
    tracing::debug!(config = ?cli.config, "Configuration loaded");

    match cli.command {
        Commands::Fees(args) => commands::fees::execute(args, &config, cli.json),
        Commands::Dividends(args) => commands::dividends::execute(args, &config, cli.json),
        Commands::Tally(args) => commands::tally::execute(args, &config, cli.json),
        Commands::Cycle(args) => commands::cycle::execute(args, &config, cli.json),
        Commands::InitConfig { .. } => Ok(()),
    }
}
