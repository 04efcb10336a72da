//! Collects run events into a [`RunReport`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use super::EventCollector;
use crate::config::SiteConfig;
use crate::error_handling::{
    ConfigError, FailureKind, FailureStats, TransportError, ValidationFailure,
};
use crate::fetch::{CheckRequest, Headers, HttpMethod, RequestId, ResponseContext};
use crate::results::Fingerprint;

/// Everything one run observed, grouped by document and site.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started: DateTime<Utc>,
    pub configs: Vec<ConfigReport>,
    /// Any configuration error, transport error or failed operation
    pub has_errors: bool,
    #[serde(skip)]
    pub stats: FailureStats,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started: Utc::now(),
            configs: Vec::new(),
            has_errors: false,
            stats: FailureStats::new(),
        }
    }

    /// All performed requests, in run order.
    pub fn requests(&self) -> impl Iterator<Item = (&ConfigReport, &RequestRecord)> {
        self.configs.iter().flat_map(|config| {
            config
                .sites
                .iter()
                .flat_map(move |site| site.requests.iter().map(move |r| (config, r)))
        })
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    /// Document path, also the results store namespace
    pub path: String,
    pub started: DateTime<Utc>,
    pub alarm_profile: Option<String>,
    pub errors: Vec<ErrorRecord>,
    pub sites: Vec<SiteReport>,
}

impl ConfigReport {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            started: Utc::now(),
            alarm_profile: None,
            errors: Vec::new(),
            sites: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub url: String,
    pub title: Option<String>,
    pub errors: Vec<ErrorRecord>,
    pub requests: Vec<RequestRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub time: DateTime<Utc>,
    pub request: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderPair {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationRecord {
    pub check: String,
    pub passed: bool,
    pub message: Option<String>,
}

/// One performed request and what happened to it.
#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub id: RequestId,
    pub fingerprint: Fingerprint,
    pub url: String,
    pub method: HttpMethod,
    pub headers: Headers,
    pub danger: u32,
    pub title: Option<String>,
    pub started: DateTime<Utc>,
    pub elapsed_ms: Option<u64>,
    pub status: Option<u16>,
    pub response_url: Option<String>,
    pub response_headers: Vec<HeaderPair>,
    pub transport_error: Option<String>,
    pub validations: Vec<ValidationRecord>,
    pub extracted: Vec<String>,
    pub failed: bool,
}

/// Outcome of a request as seen by the alarm engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Success,
    Failure,
}

impl RequestRecord {
    fn new(request: &CheckRequest) -> Self {
        Self {
            id: request.id,
            fingerprint: request.fingerprint(),
            url: request.url.to_string(),
            method: request.method,
            headers: request.headers.clone(),
            danger: request.danger,
            title: request.title.clone(),
            started: Utc::now(),
            elapsed_ms: None,
            status: None,
            response_url: None,
            response_headers: Vec::new(),
            transport_error: None,
            validations: Vec::new(),
            extracted: Vec::new(),
            failed: false,
        }
    }

    /// `None` while the request has neither a response nor an error.
    pub fn observation(&self) -> Option<Observation> {
        if self.failed {
            Some(Observation::Failure)
        } else if self.status.is_some() {
            Some(Observation::Success)
        } else {
            None
        }
    }
}

/// Builds a [`RunReport`] from run events.
///
/// Events arriving before `open_config`/`start_site` (e.g. when the executor
/// is driven directly) are filed under an unnamed document or site.
#[derive(Debug, Default)]
pub struct MemoryCollector {
    report: RunReport,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    fn config(&mut self) -> &mut ConfigReport {
        if self.report.configs.is_empty() {
            self.report.configs.push(ConfigReport::new(""));
        }
        let last = self.report.configs.len() - 1;
        &mut self.report.configs[last]
    }

    fn site(&mut self) -> &mut SiteReport {
        let config = self.config();
        if config.sites.is_empty() {
            config.sites.push(SiteReport {
                url: String::new(),
                title: None,
                errors: Vec::new(),
                requests: Vec::new(),
            });
        }
        let last = config.sites.len() - 1;
        &mut config.sites[last]
    }

    fn request(&mut self, id: RequestId) -> Option<&mut RequestRecord> {
        self.site().requests.iter_mut().rev().find(|r| r.id == id)
    }
}

impl EventCollector for MemoryCollector {
    fn open_config(&mut self, path: &str) {
        self.report.configs.push(ConfigReport::new(path));
    }

    fn config_error(&mut self, _path: &str, error: &ConfigError) {
        self.report.has_errors = true;
        self.report.stats.increment(FailureKind::Configuration);
        self.config().errors.push(ErrorRecord {
            time: Utc::now(),
            request: None,
            message: error.to_string(),
        });
    }

    fn start_site(&mut self, site: &SiteConfig) {
        let config = self.config();
        config.alarm_profile = site.alarm_profile.clone();
        config.sites.push(SiteReport {
            url: site.base_url.to_string(),
            title: site.title.clone(),
            errors: Vec::new(),
            requests: Vec::new(),
        });
    }

    fn check_error(&mut self, request: &str, error: &ConfigError) {
        self.report.has_errors = true;
        self.report.stats.increment(FailureKind::Configuration);
        self.site().errors.push(ErrorRecord {
            time: Utc::now(),
            request: Some(request.to_string()),
            message: error.to_string(),
        });
    }

    fn open_url(&mut self, request: &CheckRequest) {
        self.site().requests.push(RequestRecord::new(request));
    }

    fn url_error(&mut self, request: &CheckRequest, elapsed: Duration, error: &TransportError) {
        self.report.has_errors = true;
        self.report.stats.increment(FailureKind::from(error));
        if let Some(record) = self.request(request.id) {
            record.elapsed_ms = Some(elapsed.as_millis() as u64);
            record.transport_error = Some(error.to_string());
            record.failed = true;
        }
    }

    fn url_response(&mut self, request: &CheckRequest, elapsed: Duration, response: &ResponseContext) {
        if let Some(record) = self.request(request.id) {
            record.elapsed_ms = Some(elapsed.as_millis() as u64);
            record.status = Some(response.status);
            record.response_url = Some(response.url.to_string());
            record.response_headers = response
                .sorted_headers()
                .into_iter()
                .map(|(name, value)| HeaderPair { name, value })
                .collect();
        }
    }

    fn check_success(&mut self, request: &CheckRequest, check: &str) {
        if let Some(record) = self.request(request.id) {
            record.validations.push(ValidationRecord {
                check: check.to_string(),
                passed: true,
                message: None,
            });
        }
    }

    fn check_failure(
        &mut self,
        request: &CheckRequest,
        check: &str,
        failure: &ValidationFailure,
        _response: &ResponseContext,
    ) {
        self.report.has_errors = true;
        self.report.stats.increment(FailureKind::Validation);
        if let Some(record) = self.request(request.id) {
            record.validations.push(ValidationRecord {
                check: check.to_string(),
                passed: false,
                message: Some(failure.to_string()),
            });
            record.failed = true;
        }
    }

    fn extracted(&mut self, request: &CheckRequest, _check: &str, url: &Url) {
        if let Some(record) = self.request(request.id) {
            record.extracted.push(url.to_string());
        }
    }
}
