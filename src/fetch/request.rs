//! Request model and request resolution.
//!
//! A check node's `request` spec is expanded against the enclosing [`Scope`]
//! into concrete requests: the path is joined onto the current base URL and
//! the scope's method and headers are inherited, with the node's overrides
//! merged on top.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use strum_macros::{Display, EnumString};
use url::Url;

use crate::error_handling::ConfigError;
use crate::operations::ReaderKind;
use crate::results::Fingerprint;

/// Request headers, keyed by lower-cased header name.
pub type Headers = BTreeMap<String, String>;

/// HTTP methods a check may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Options,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Where a structured request takes its path from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestSource {
    /// A literal path or URL
    Path(String),
    /// The value extracted by the enclosing reader
    Reader(ReaderKind),
}

/// The `request` part of a check node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestSpec {
    /// No request given: the current base URL is requested as is
    #[default]
    Inherit,
    /// A literal path or URL
    Path(String),
    /// Mapping with optional source and method/header overrides
    Structured {
        src: Option<RequestSource>,
        method: Option<HttpMethod>,
        headers: Headers,
    },
}

impl fmt::Display for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestSpec::Inherit => f.write_str("(inherited)"),
            RequestSpec::Path(path) => write!(f, "{path:?}"),
            RequestSpec::Structured {
                src,
                method,
                headers,
            } => {
                f.write_str("{")?;
                match src {
                    Some(RequestSource::Path(path)) => write!(f, "src: {path:?}")?,
                    Some(RequestSource::Reader(kind)) => write!(f, "src: {}", kind.name())?,
                    None => f.write_str("src: (inherited)")?,
                }
                if let Some(method) = method {
                    write!(f, ", method: {method}")?;
                }
                if !headers.is_empty() {
                    write!(f, ", headers: {headers:?}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Request defaults in effect while walking a check tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub base_url: Url,
    pub method: HttpMethod,
    pub headers: Headers,
    /// Whether the checks being walked were reached through a reader
    pub under_reader: bool,
}

impl Scope {
    pub fn new(base_url: Url, method: HttpMethod, headers: Headers) -> Self {
        Self {
            base_url,
            method,
            headers,
            under_reader: false,
        }
    }

    /// Scope for checks nested below the current one, rooted at `base_url`.
    pub fn descend(&self, base_url: Url, under_reader: bool) -> Self {
        Self {
            base_url,
            method: self.method,
            headers: self.headers.clone(),
            under_reader,
        }
    }
}

/// A request spec resolved against a scope, ready to be issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub headers: Headers,
}

/// Run-unique identifier of an issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

/// A request as reported to collectors: what is being called and for which check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    pub id: RequestId,
    pub url: Url,
    pub method: HttpMethod,
    pub headers: Headers,
    pub danger: u32,
    pub title: Option<String>,
}

impl CheckRequest {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(self.method, &self.url, &self.headers)
    }
}

/// Expands a request spec into the concrete requests to issue.
///
/// A literal or absent request yields exactly one request inheriting the
/// scope's method and headers. A structured request merges its headers on top
/// of the scope's (its own win on collision) and may override the method. A
/// structured request whose `src` names a reader stands for the value the
/// enclosing reader extracted, which is already the scope's base URL.
///
/// # Errors
///
/// Returns `ConfigError::ReaderSourceOutsideReader` when a reader source is
/// used outside a reader's nested checks, and `ConfigError::InvalidUrl` when
/// the path cannot be joined onto the base URL.
pub fn resolve_requests(
    spec: &RequestSpec,
    scope: &Scope,
) -> Result<Vec<ResolvedRequest>, ConfigError> {
    let (path, method, headers) = match spec {
        RequestSpec::Inherit => ("", scope.method, scope.headers.clone()),
        RequestSpec::Path(path) => (path.as_str(), scope.method, scope.headers.clone()),
        RequestSpec::Structured {
            src,
            method,
            headers,
        } => {
            let path = match src {
                Some(RequestSource::Path(path)) => path.as_str(),
                Some(RequestSource::Reader(kind)) => {
                    if !scope.under_reader {
                        return Err(ConfigError::ReaderSourceOutsideReader(
                            kind.name().to_string(),
                        ));
                    }
                    ""
                }
                None => "",
            };

            let mut merged = scope.headers.clone();
            merged.extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));

            (path, method.unwrap_or(scope.method), merged)
        }
    };

    let url = join_url(&scope.base_url, path)?;
    Ok(vec![ResolvedRequest {
        url,
        method,
        headers,
    }])
}

/// Resolves a path against a base URL using standard relative-URL rules.
///
/// An empty path yields the base URL itself; `//host/x`, `/x` and `x` resolve
/// as scheme-relative, absolute and relative references respectively.
pub fn join_url(base: &Url, path: &str) -> Result<Url, ConfigError> {
    base.join(path.trim()).map_err(|e| ConfigError::InvalidUrl {
        url: path.to_string(),
        message: e.to_string(),
    })
}
