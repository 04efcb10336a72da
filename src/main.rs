//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `site_monitor` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use site_monitor::config::{Cli, Command};
use site_monitor::initialization::init_logger_with;
use site_monitor::{run_check, run_debug, AlarmOutcome, CheckOptions, DebugOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let result = match &cli.command {
        Command::Debug { .. } => debug(cli.command.debug_options()).await,
        Command::Check { .. } => check(cli.command.check_options()).await,
    };

    if let Err(e) = result {
        eprintln!("site_monitor error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}

async fn debug(options: Option<DebugOptions>) -> Result<()> {
    run_debug(options.unwrap_or_default()).await
}

async fn check(options: Option<CheckOptions>) -> Result<()> {
    let report = run_check(options.unwrap_or_default()).await?;
    match report.outcome {
        AlarmOutcome::AllClear => {}
        AlarmOutcome::AlreadyReported => {
            println!("Errors found, already reported ({} stored)", report.stored_failures)
        }
        AlarmOutcome::Notified { danger, delivered } => println!(
            "Errors found, danger {} alarm delivered to {} receiver{}",
            danger,
            delivered,
            if delivered == 1 { "" } else { "s" }
        ),
    }
    Ok(())
}
