//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, file names, alarm windows)
//! - Site documents: parsing YAML into check trees
//! - Alarm profiles (`_alarms.yml`) and SMTP settings (`_mta.yml`)
//! - CLI and run option types

mod alarms;
mod cli;
mod constants;
mod mta;
mod site;
mod types;
mod yaml;

// Re-export all constants
pub use constants::*;
pub use alarms::{AlarmChannels, AlarmProfile, AlarmProfiles, DangerLevel, DEFAULT_PROFILE};
pub use cli::{Cli, Command};
pub use mta::MtaConfig;
pub use site::{parse_site, CheckNode, CheckSlot, SiteConfig};
pub use types::{CheckOptions, DebugOptions, LogFormat, LogLevel};

pub(crate) use site::{parse_checks, parse_headers};
pub(crate) use yaml::{as_unsigned, describe, flag, unknown_keys};
