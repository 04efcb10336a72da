//! Event collectors.
//!
//! The loader and the executor report everything they do through an
//! [`EventCollector`]. Debug runs print events live ([`ConsoleCollector`]);
//! check runs accumulate them into a [`RunReport`] ([`MemoryCollector`]) that
//! feeds the alarm engine and the HTML report.

mod console;
mod memory;

use std::time::Duration;

use url::Url;

use crate::config::SiteConfig;
use crate::error_handling::{ConfigError, TransportError, ValidationFailure};
use crate::fetch::{CheckRequest, ResponseContext};

pub use console::ConsoleCollector;
pub use memory::{
    ConfigReport, ErrorRecord, HeaderPair, MemoryCollector, Observation, RequestRecord, RunReport,
    SiteReport, ValidationRecord,
};

/// Receives run events.
///
/// Every method has a no-op default so collectors only implement what they
/// care about. Events for one request always arrive in the order
/// `start_check`, `open_url`, then `url_error` or `url_response`, then zero
/// or more `check_success`/`extracted`, and at most one `check_failure`.
pub trait EventCollector: Send {
    /// A site document is about to be loaded
    fn open_config(&mut self, _path: &str) {}

    /// The whole document was rejected
    fn config_error(&mut self, _path: &str, _error: &ConfigError) {}

    /// The document loaded and its checks are starting
    fn start_site(&mut self, _site: &SiteConfig) {}

    fn start_check(&mut self, _request: &CheckRequest) {}

    /// A check branch was rejected; `request` describes its request spec
    fn check_error(&mut self, _request: &str, _error: &ConfigError) {}

    fn open_url(&mut self, _request: &CheckRequest) {}

    fn url_error(&mut self, _request: &CheckRequest, _elapsed: Duration, _error: &TransportError) {
    }

    fn url_response(
        &mut self,
        _request: &CheckRequest,
        _elapsed: Duration,
        _response: &ResponseContext,
    ) {
    }

    /// An operation passed
    fn check_success(&mut self, _request: &CheckRequest, _check: &str) {}

    /// An operation failed; the node's remaining operations are skipped
    fn check_failure(
        &mut self,
        _request: &CheckRequest,
        _check: &str,
        _failure: &ValidationFailure,
        _response: &ResponseContext,
    ) {
    }

    /// A reader produced a URL for nested checks
    fn extracted(&mut self, _request: &CheckRequest, _check: &str, _url: &Url) {}
}
