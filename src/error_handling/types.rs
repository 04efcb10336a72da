//! Error type definitions.
//!
//! This module defines the error types used throughout the application, one
//! enum per concern: configuration, validation, transport, persistence,
//! notification and initialization.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Malformed or semantically invalid document content.
///
/// Depending on where it is raised, it aborts either the whole document (bad
/// schema, method, headers) or only the affected check branch (bad request
/// spec, unknown operation, bad selector).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Cannot read {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("Invalid YAML document: {0}")]
    Syntax(String),

    #[error("Invalid schema version number: {0}")]
    InvalidSchemaNumber(String),

    #[error("Invalid schema version: {0}")]
    UnsupportedSchema(i64),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("Invalid headers list: {0}")]
    InvalidHeaders(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid request URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid response processor: {0}")]
    UnknownOperation(String),

    #[error("Invalid parameters for {operation}: {message}")]
    InvalidParameters { operation: String, message: String },

    #[error("Invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("HTML/XML readers require at least one selector")]
    MissingSelectors,

    #[error("Checks are nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("Request source {0:?} is only valid for checks nested under a reader")]
    ReaderSourceOutsideReader(String),

    #[error("The \"default\" alarm profile is missing")]
    MissingDefaultProfile,
}

/// A validator's business-rule failure (wrong status, content-type, size...).
///
/// Always recoverable at the check level: it is recorded as a failed check and
/// stops the remaining operations of that node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationFailure(String);

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Network-level failure of a single request.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("No response: {0}")]
    Timeout(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

impl From<ReqwestError> for TransportError {
    fn from(e: ReqwestError) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Error types for results store persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Results store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Results store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Results store replace error: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Error types for alarm delivery.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid e-mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Cannot compose e-mail: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Alarm command {command:?} failed: {message}")]
    Command { command: String, message: String },
}

/// Categories of failures recorded during a run.
///
/// Used for end-of-run statistics; each recorded problem falls into exactly
/// one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum FailureKind {
    /// Document or check branch rejected by the loader
    Configuration,
    /// A validator or reader failed
    Validation,
    /// A request timed out
    Timeout,
    /// A request failed for another network reason
    Transport,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Configuration => "Configuration error",
            FailureKind::Validation => "Validation failure",
            FailureKind::Timeout => "Request timeout",
            FailureKind::Transport => "Transport error",
        }
    }
}

impl From<&TransportError> for FailureKind {
    fn from(e: &TransportError) -> Self {
        if e.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Transport
        }
    }
}
