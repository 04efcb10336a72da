//! Configuration types and run options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and for driving the library's two run modes.

use std::path::PathBuf;

use clap::ValueEnum;

use crate::config::constants::DEFAULT_STATS_PATH;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Options for the `debug` run mode.
///
/// Runs the checks of one document or of a whole directory and prints every
/// event live. When `output` or `email` is set the events are collected
/// instead and rendered as a report.
///
/// # Examples
///
/// ```no_run
/// use site_monitor::DebugOptions;
/// use std::path::PathBuf;
///
/// let options = DebugOptions {
///     data: PathBuf::from("sites/example.yml"),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct DebugOptions {
    /// Site document or directory of site documents
    pub data: PathBuf,

    /// Write the rendered HTML report here
    pub output: Option<PathBuf>,

    /// Send the rendered report to this address to test the MTA settings
    pub email: Option<String>,
}

impl Default for DebugOptions {
    fn default() -> Self {
        Self {
            data: PathBuf::from("."),
            output: None,
            email: None,
        }
    }
}

/// Options for the `check` run mode.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Directory with site documents, `_alarms.yml` and `_mta.yml`
    pub data: PathBuf,

    /// Persisted results store (locked for the whole run)
    pub stats: PathBuf,

    /// Write the rendered HTML report here, even when every check passed
    pub output: Option<PathBuf>,

    /// Discard stored results not observed for this many hours.
    ///
    /// `None` keeps entries until they recover.
    pub retention_hours: Option<u64>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            data: PathBuf::from("."),
            stats: PathBuf::from(DEFAULT_STATS_PATH),
            output: None,
            retention_hours: None,
        }
    }
}
