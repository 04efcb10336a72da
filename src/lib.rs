//! site_monitor library: declarative synthetic monitoring of websites
//!
//! Site documents describe a tree of HTTP checks: what to request, which
//! validators and readers to run on the response, and which nested checks to
//! run on the URLs a reader extracts. A check run walks every tree, collects
//! the results, and decides from the persisted history whether an alarm is
//! due.
//!
//! # Example
//!
//! ```no_run
//! use site_monitor::{run_check, CheckOptions};
//! use std::path::PathBuf;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = CheckOptions {
//!     data: PathBuf::from("/etc/site_monitor"),
//!     stats: PathBuf::from("/var/lib/site_monitor/_stats.json"),
//!     ..Default::default()
//! };
//!
//! let report = run_check(options).await?;
//! println!("{} requests, alarm outcome: {:?}", report.requests, report.outcome);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod alarms;
mod app;
pub mod collector;
pub mod config;
pub mod error_handling;
pub mod executor;
pub mod fetch;
pub mod initialization;
pub mod loader;
pub mod notify;
pub mod operations;
pub mod results;
mod run;
mod utils;

// Re-export public API
pub use alarms::{AlarmEngine, AlarmOutcome};
pub use collector::{ConsoleCollector, EventCollector, MemoryCollector, RunReport};
pub use config::{parse_site, CheckOptions, DebugOptions, LogFormat, LogLevel, SiteConfig};
pub use executor::CheckExecutor;
pub use loader::Loader;
pub use results::{ResultsStore, RetentionPolicy};
pub use run::{run_check, run_debug, CheckReport};
