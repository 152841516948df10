//! QuoteHarvest CLI - Main Entry Point
//!
//! Harvests premium quotes from the remote quoting form and manages the
//! stored records and exports.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use quoteharvest_harvester::HarvestError;

mod commands;
mod output;

use commands::{config, export, records, run};

/// QuoteHarvest - insurance premium quote harvester
#[derive(Parser)]
#[command(name = "quoteharvest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "QUOTEHARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file, truncated on start
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest every configured combination and export the results
    Run(run::RunArgs),

    /// Export stored records without harvesting
    Export(export::ExportArgs),

    /// List stored records, newest first
    Records(records::RecordsArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

/// Exit code for a run aborted by a failed login
const EXIT_LOGIN_FAILED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        output::print_error(&format!("{:#}", e));
        return ExitCode::FAILURE;
    }

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            output::print_error(&format!("{:#}", e));
            exit_code(&e)
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .unwrap_or_else(quoteharvest_common::default_config_path);

    match cli.command {
        Commands::Run(args) => run::execute(args, &config_path, cli.format).await,
        Commands::Export(args) => export::execute(args, &config_path, cli.format).await,
        Commands::Records(args) => records::execute(args, &config_path, cli.format).await,
        Commands::Config(cmd) => config::execute(cmd, &config_path).await,
    }
}

fn exit_code(e: &anyhow::Error) -> ExitCode {
    match e.downcast_ref::<HarvestError>() {
        Some(err) if err.is_fatal() => ExitCode::from(EXIT_LOGIN_FAILED),
        _ => ExitCode::FAILURE,
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{level},fantoccini=warn,hyper=warn,hyper_util=warn,rustls=warn"
        ))
    });

    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}
