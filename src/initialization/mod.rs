//! Application initialization and resource setup.
//!
//! - HTTP clients (per site, honoring the site's timeout)
//! - Logger (plain or JSON, level from the CLI)

mod client;
mod logger;

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;
