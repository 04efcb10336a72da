//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::constants::DEFAULT_STATS_PATH;
use super::types::{CheckOptions, DebugOptions, LogFormat, LogLevel};

/// Runs declarative HTTP checks against websites.
#[derive(Debug, Parser)]
#[command(name = "site_monitor", version, about)]
pub struct Cli {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value = "plain", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run checks and print every event, without touching stored results
    Debug {
        /// Site document or directory of site documents
        #[arg(short = 'd', long = "data", value_name = "PATH")]
        data: PathBuf,

        /// Write an HTML report to this file instead of printing events
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,

        /// Send the report to this address (uses _mta.yml)
        #[arg(short = 'e', long = "email", value_name = "ADDRESS")]
        email: Option<String>,
    },

    /// Run all checks of a data directory, update results and send alarms
    Check {
        /// Directory with site documents, _alarms.yml and _mta.yml
        #[arg(short = 'd', long = "data", value_name = "DIR")]
        data: PathBuf,

        /// Results store
        #[arg(short = 's', long = "stats", value_name = "FILE", default_value = DEFAULT_STATS_PATH)]
        stats: PathBuf,

        /// Always write an HTML report to this file
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,

        /// Forget failures not observed for this many hours
        #[arg(long, value_name = "HOURS")]
        retention_hours: Option<u64>,
    },
}

impl Command {
    pub fn debug_options(&self) -> Option<DebugOptions> {
        match self {
            Command::Debug {
                data,
                output,
                email,
            } => Some(DebugOptions {
                data: data.clone(),
                output: output.clone(),
                email: email.clone(),
            }),
            Command::Check { .. } => None,
        }
    }

    pub fn check_options(&self) -> Option<CheckOptions> {
        match self {
            Command::Check {
                data,
                stats,
                output,
                retention_hours,
            } => Some(CheckOptions {
                data: data.clone(),
                stats: stats.clone(),
                output: output.clone(),
                retention_hours: *retention_hours,
            }),
            Command::Debug { .. } => None,
        }
    }
}
