//! Configuration constants.
//!
//! This module defines the constants used throughout the application,
//! including timeouts, size limits, file names and alarm windows.

/// Only schema version understood by the site document loader.
pub const SUPPORTED_SCHEMA: i64 = 1;

/// Default request timeout in seconds when a site document doesn't set `timeout`.
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// Danger assigned to a check that doesn't configure one.
pub const DEFAULT_DANGER: u32 = 1;

/// Statuses accepted by `ValidResponse` when no `status` list is configured.
pub const DEFAULT_VALID_STATUSES: &[u16] = &[200, 201];

/// Maximum nesting depth of check trees.
///
/// Readers recurse into nested checks for every extracted value. The limit is
/// enforced when documents are loaded so a runaway configuration fails before
/// any request is issued.
pub const MAX_CHECK_DEPTH: usize = 8;

/// Maximum response body size in bytes (10MB)
/// Responses larger than this are reported as transport errors
pub const MAX_RESPONSE_BODY_SIZE: usize = 10 * 1024 * 1024;

// Alarm debounce windows
/// Minimum time between two alarms for the same fingerprint
pub const ALARM_WINDOW_HOURS: i64 = 24;
/// Once a failure is older than this, the long window applies
pub const ALARM_ESCALATION_DAYS: i64 = 3;
/// Minimum time between two alarms for a long-standing failure
pub const ALARM_LONG_WINDOW_DAYS: i64 = 7;

// Files living next to the site documents
/// Alarm profiles document
pub const ALARMS_FILE: &str = "_alarms.yml";
/// SMTP settings document
pub const MTA_FILE: &str = "_mta.yml";
/// Default location of the persisted results store
pub const DEFAULT_STATS_PATH: &str = "_stats.json";

/// Time an `execute` alarm command may take before it is killed.
pub const ALARM_COMMAND_TIMEOUT_SECS: u64 = 60;

/// Subject used for alarm e-mails unless `_mta.yml` overrides it.
pub const DEFAULT_MAIL_SUBJECT: &str = "Site monitor ALERT!";

/// Default SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// User-Agent sent when a site document doesn't configure one.
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// Console thresholds for colouring response times
/// Responses slower than this are highlighted as slow
pub const SLOW_RESPONSE_MS: u128 = 2000;
/// Responses slower than this are highlighted as sluggish
pub const SLUGGISH_RESPONSE_MS: u128 = 800;
