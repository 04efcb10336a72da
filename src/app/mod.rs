//! Main application helpers.

pub mod statistics;

// Re-export public API
pub use statistics::{print_failure_statistics, print_run_summary};
