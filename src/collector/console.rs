//! Prints run events as they happen.

use std::time::Duration;

use chrono::Local;
use colored::*;
use url::Url;

use super::EventCollector;
use crate::config::{SiteConfig, SLOW_RESPONSE_MS, SLUGGISH_RESPONSE_MS};
use crate::error_handling::{ConfigError, TransportError, ValidationFailure};
use crate::fetch::{CheckRequest, ResponseContext};

const SEPARATOR: &str = "------------------------------------------------------------";

fn now() -> String {
    Local::now().format("%Y.%m.%d %H:%M:%S").to_string()
}

/// Writes a human-readable trace of the run to stdout.
#[derive(Debug, Default)]
pub struct ConsoleCollector;

impl ConsoleCollector {
    pub fn new() -> Self {
        Self
    }
}

impl EventCollector for ConsoleCollector {
    fn open_config(&mut self, path: &str) {
        println!("{}", SEPARATOR.bold());
        println!("{} Loading {}", now(), path.bold());
    }

    fn config_error(&mut self, path: &str, error: &ConfigError) {
        println!("{} {} {}: {}", now(), "Invalid config".red().bold(), path, error);
    }

    fn start_site(&mut self, site: &SiteConfig) {
        match &site.title {
            Some(title) => println!("{} Site {} ({})", now(), title.bold(), site.base_url),
            None => println!("{} Site {}", now(), site.base_url.as_str().bold()),
        }
    }

    fn start_check(&mut self, request: &CheckRequest) {
        println!("{SEPARATOR}");
        if let Some(title) = &request.title {
            println!("{} {}", now(), title.bold());
        }
    }

    fn check_error(&mut self, request: &str, error: &ConfigError) {
        println!(
            "{} {} for request {}: {}",
            now(),
            "Cannot run check".red().bold(),
            request,
            error
        );
    }

    fn open_url(&mut self, request: &CheckRequest) {
        println!(
            "{} Requesting {} {} (danger {})",
            now(),
            request.method,
            request.url.as_str().cyan(),
            request.danger
        );
    }

    fn url_error(&mut self, request: &CheckRequest, elapsed: Duration, error: &TransportError) {
        println!(
            "{} {} {} after {}ms: {}",
            now(),
            "No response from".red().bold(),
            request.url,
            elapsed.as_millis(),
            error
        );
    }

    fn url_response(&mut self, _request: &CheckRequest, elapsed: Duration, response: &ResponseContext) {
        let ms = elapsed.as_millis();
        let timing = format!("{ms}ms");
        let timing = if ms > SLOW_RESPONSE_MS {
            timing.red()
        } else if ms > SLUGGISH_RESPONSE_MS {
            timing.yellow()
        } else {
            timing.green()
        };
        println!(
            "{} Response {} in {} ({} bytes)",
            now(),
            response.status,
            timing,
            response.content.len()
        );
    }

    fn check_success(&mut self, _request: &CheckRequest, check: &str) {
        println!("{} {} {}", now(), "OK".green().bold(), check);
    }

    fn check_failure(
        &mut self,
        request: &CheckRequest,
        check: &str,
        failure: &ValidationFailure,
        response: &ResponseContext,
    ) {
        println!("{} {} {}: {}", now(), "FAILED".red().bold(), check, failure);
        println!("    Request headers:");
        for (name, value) in &request.headers {
            println!("        {name}: {value}");
        }
        println!("    Response headers:");
        for (name, value) in response.sorted_headers() {
            println!("        {name}: {value}");
        }
    }

    fn extracted(&mut self, _request: &CheckRequest, check: &str, url: &Url) {
        println!("{} {} found {}", now(), check, url.as_str().cyan());
    }
}
