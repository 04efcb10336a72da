//! Site document model and parsing.
//!
//! A site document is a YAML mapping:
//!
//! ```yaml
//! schema: 1
//! host: www.example.com
//! method: GET
//! headers:
//!   accept-language: en
//! timeout: 10
//! alarms: default
//! checks:
//!   - request: /
//!     response:
//!       - ValidResponse
//!       - validator: HasHeaders
//!         headers:
//!           content-type: text/html
//! ```
//!
//! Document-level problems (schema, host, method, headers, timeout) reject
//! the whole document. A malformed check only invalidates its own branch: it
//! is kept as [`CheckSlot::Invalid`] so the executor can report it while its
//! siblings still run.

use std::time::Duration;

use serde_yaml::{Mapping, Value};
use url::Url;

use super::constants::{DEFAULT_DANGER, DEFAULT_TIMEOUT_SECS, MAX_CHECK_DEPTH, SUPPORTED_SCHEMA};
use super::yaml::{as_unsigned, describe, scalar_to_string};
use crate::error_handling::ConfigError;
use crate::fetch::{Headers, HttpMethod, RequestSource, RequestSpec};
use crate::operations::{Operation, ReaderKind};

/// A parsed site document.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub host: String,
    /// Root URL of the check tree (`https://{host}` unless `host` has a scheme)
    pub base_url: Url,
    pub method: HttpMethod,
    pub headers: Headers,
    pub timeout: Duration,
    pub title: Option<String>,
    /// Alarm profile name; `None` selects the default profile
    pub alarm_profile: Option<String>,
    pub checks: Vec<CheckSlot>,
}

/// One entry of a `checks` list.
#[derive(Debug, Clone)]
pub enum CheckSlot {
    Valid(CheckNode),
    /// A check that failed to load, reported when its turn comes
    Invalid {
        request: String,
        error: ConfigError,
    },
}

/// A check: one request, the operations run on its response, and optional
/// checks nested below it.
#[derive(Debug, Clone)]
pub struct CheckNode {
    pub request: RequestSpec,
    pub response: Vec<Operation>,
    /// Checks rooted at this node's response URL, run once the pipeline passes
    pub checks: Vec<CheckSlot>,
    pub title: Option<String>,
    pub danger: u32,
}

/// Parses a site document from YAML text.
///
/// # Errors
///
/// Returns a `ConfigError` when the document as a whole is unusable.
pub fn parse_site(text: &str) -> Result<SiteConfig, ConfigError> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| ConfigError::Syntax(e.to_string()))?;
    SiteConfig::from_value(&value)
}

impl SiteConfig {
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let map = value.as_mapping().ok_or_else(|| ConfigError::InvalidField {
            field: "document".into(),
            message: format!("expected a mapping, got {}", describe(value)),
        })?;

        check_schema(map.get("schema"))?;

        let host = map
            .get("host")
            .and_then(scalar_to_string)
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField("host".into()))?;
        let base_url = base_url_for(host.trim())?;

        let method = match map.get("method") {
            None => HttpMethod::Get,
            Some(value) => parse_method(value)?,
        };

        let headers = match map.get("headers") {
            None => Headers::new(),
            Some(value) => parse_headers(value)?,
        };

        let timeout = match map.get("timeout") {
            None | Some(Value::Null) => Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            Some(value) => parse_timeout(value)?,
        };

        let title = optional_string(map, "title")?;
        let alarm_profile = optional_string(map, "alarms")?;

        let checks = match map.get("checks") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => parse_checks(value, 0)?,
        };

        Ok(SiteConfig {
            host,
            base_url,
            method,
            headers,
            timeout,
            title,
            alarm_profile,
            checks,
        })
    }
}

fn check_schema(value: Option<&Value>) -> Result<(), ConfigError> {
    let schema = match value {
        None => return Ok(()),
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    match schema {
        Some(SUPPORTED_SCHEMA) => Ok(()),
        Some(other) => Err(ConfigError::UnsupportedSchema(other)),
        None => Err(ConfigError::InvalidSchemaNumber(
            value.map(describe).unwrap_or_default(),
        )),
    }
}

fn base_url_for(host: &str) -> Result<Url, ConfigError> {
    let raw = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.clone(),
        message: e.to_string(),
    })
}

pub(crate) fn parse_method(value: &Value) -> Result<HttpMethod, ConfigError> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ConfigError::InvalidMethod(describe(value)))
}

/// Parses a header mapping. Names are lower-cased, scalar values stringified.
pub(crate) fn parse_headers(value: &Value) -> Result<Headers, ConfigError> {
    let map = value
        .as_mapping()
        .ok_or_else(|| ConfigError::InvalidHeaders(describe(value)))?;

    let mut headers = Headers::new();
    for (k, v) in map {
        let name = k
            .as_str()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ConfigError::InvalidHeaders(describe(value)))?;
        let text = scalar_to_string(v).ok_or_else(|| ConfigError::InvalidHeaders(describe(value)))?;
        headers.insert(name.to_ascii_lowercase(), text);
    }
    Ok(headers)
}

fn parse_timeout(value: &Value) -> Result<Duration, ConfigError> {
    let seconds = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    seconds
        .filter(|s| *s > 0.0)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .ok_or_else(|| ConfigError::InvalidField {
            field: "timeout".into(),
            message: format!("expected a positive number of seconds, got {}", describe(value)),
        })
}

fn optional_string(map: &Mapping, key: &str) -> Result<Option<String>, ConfigError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_to_string(value)
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidField {
                field: key.into(),
                message: format!("expected text, got {}", describe(value)),
            }),
    }
}

/// Parses a `checks` list found at nesting `depth` (0 for the document root).
///
/// Individual malformed checks become [`CheckSlot::Invalid`]. The list itself
/// must be a sequence and must not be nested deeper than `MAX_CHECK_DEPTH`.
pub(crate) fn parse_checks(value: &Value, depth: usize) -> Result<Vec<CheckSlot>, ConfigError> {
    if depth > MAX_CHECK_DEPTH {
        return Err(ConfigError::TooDeep(MAX_CHECK_DEPTH));
    }

    let items = value.as_sequence().ok_or_else(|| ConfigError::InvalidField {
        field: "checks".into(),
        message: format!("expected a list, got {}", describe(value)),
    })?;

    Ok(items
        .iter()
        .map(|item| match CheckNode::from_value(item, depth) {
            Ok(node) => CheckSlot::Valid(node),
            Err(error) => {
                let request = item
                    .as_mapping()
                    .and_then(|m| m.get("request"))
                    .map(describe)
                    .unwrap_or_else(|| describe(item));
                log::debug!("Rejected check {}: {}", request, error);
                CheckSlot::Invalid { request, error }
            }
        })
        .collect())
}

impl CheckNode {
    fn from_value(value: &Value, depth: usize) -> Result<Self, ConfigError> {
        let map = value
            .as_mapping()
            .ok_or_else(|| ConfigError::InvalidRequest(describe(value)))?;

        let request = parse_request(map.get("request"))?;

        let response = match map.get("response") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(ops)) => ops
                .iter()
                .map(|op| Operation::from_value(op, depth))
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(ConfigError::InvalidField {
                    field: "response".into(),
                    message: format!("expected a list, got {}", describe(other)),
                })
            }
        };

        let checks = match map.get("checks") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => parse_checks(value, depth + 1)?,
        };

        let danger = match map.get("danger") {
            None | Some(Value::Null) => DEFAULT_DANGER,
            Some(value) => as_unsigned(value)
                .and_then(|d| u32::try_from(d).ok())
                .filter(|d| *d > 0)
                .ok_or_else(|| ConfigError::InvalidField {
                    field: "danger".into(),
                    message: format!("expected a positive integer, got {}", describe(value)),
                })?,
        };

        Ok(CheckNode {
            request,
            response,
            checks,
            title: optional_string(map, "title")?,
            danger,
        })
    }
}

fn parse_request(value: Option<&Value>) -> Result<RequestSpec, ConfigError> {
    match value {
        None | Some(Value::Null) => Ok(RequestSpec::Inherit),
        Some(Value::String(path)) => Ok(RequestSpec::Path(path.clone())),
        Some(Value::Mapping(map)) => {
            let src = match map.get("src") {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(match ReaderKind::from_name(s) {
                    Some(kind) => RequestSource::Reader(kind),
                    None => RequestSource::Path(s.clone()),
                }),
                Some(other) => return Err(ConfigError::InvalidRequest(describe(other))),
            };
            let method = map.get("method").map(parse_method).transpose()?;
            let headers = map
                .get("headers")
                .map(parse_headers)
                .transpose()?
                .unwrap_or_default();
            Ok(RequestSpec::Structured {
                src,
                method,
                headers,
            })
        }
        Some(other) => Err(ConfigError::InvalidRequest(describe(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document_defaults() {
        let site = parse_site("host: www.example.pl").unwrap();
        assert_eq!(site.base_url.as_str(), "https://www.example.pl/");
        assert_eq!(site.method, HttpMethod::Get);
        assert!(site.headers.is_empty());
        assert_eq!(site.timeout, Duration::from_secs(10));
        assert!(site.checks.is_empty());
        assert!(site.alarm_profile.is_none());
    }

    #[test]
    fn test_host_with_scheme_is_used_verbatim() {
        let site = parse_site("host: http://127.0.0.1:8080/app/").unwrap();
        assert_eq!(site.base_url.as_str(), "http://127.0.0.1:8080/app/");
    }

    #[test]
    fn test_missing_host() {
        assert_eq!(
            parse_site("schema: 1").unwrap_err(),
            ConfigError::MissingField("host".into())
        );
    }

    #[test]
    fn test_accepted_schema_spellings() {
        for schema in ["1", "1.0", "'1'"] {
            let doc = format!("schema: {schema}\nhost: www.example.pl");
            assert!(parse_site(&doc).is_ok(), "schema {schema} should be accepted");
        }
    }

    #[test]
    fn test_unsupported_schema() {
        for schema in ["0", "1000", "-1"] {
            let doc = format!("schema: {schema}\nhost: www.example.pl");
            assert!(
                matches!(parse_site(&doc), Err(ConfigError::UnsupportedSchema(_))),
                "schema {schema} should be unsupported"
            );
        }
    }

    #[test]
    fn test_invalid_schema_number() {
        for schema in ["~", "false", "''", "{}", "[]", "abc", "1.5"] {
            let doc = format!("schema: {schema}\nhost: www.example.pl");
            assert!(
                matches!(parse_site(&doc), Err(ConfigError::InvalidSchemaNumber(_))),
                "schema {schema} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_method() {
        for method in ["BAD", "get", "~", "1", "[]"] {
            let doc = format!("host: www.example.pl\nmethod: {method}");
            assert!(
                matches!(parse_site(&doc), Err(ConfigError::InvalidMethod(_))),
                "method {method} should be rejected"
            );
        }
    }

    #[test]
    fn test_valid_methods() {
        for method in ["GET", "POST", "PUT", "DELETE", "OPTIONS"] {
            let doc = format!("host: www.example.pl\nmethod: {method}");
            let site = parse_site(&doc).unwrap();
            assert_eq!(site.method.to_string(), method);
        }
    }

    #[test]
    fn test_invalid_headers() {
        for headers in ["0", "1000", "~", "false", "''", "[]", "[a, b]"] {
            let doc = format!("host: www.example.pl\nheaders: {headers}");
            assert!(
                matches!(parse_site(&doc), Err(ConfigError::InvalidHeaders(_))),
                "headers {headers} should be rejected"
            );
        }
    }

    #[test]
    fn test_headers_are_lowercased_and_stringified() {
        let site = parse_site(
            "host: www.example.pl\nheaders:\n  User-Agent: uptime-bot\n  X-Retry: 3\n  DNT: true",
        )
        .unwrap();
        assert_eq!(site.headers["user-agent"], "uptime-bot");
        assert_eq!(site.headers["x-retry"], "3");
        assert_eq!(site.headers["dnt"], "true");
    }

    #[test]
    fn test_timeout() {
        let site = parse_site("host: www.example.pl\ntimeout: 2.5").unwrap();
        assert_eq!(site.timeout, Duration::from_millis(2500));

        for timeout in ["0", "-3", "soon", "[]", "1e20", ".inf", "'1e300'"] {
            let doc = format!("host: www.example.pl\ntimeout: {timeout}");
            assert!(parse_site(&doc).is_err(), "timeout {timeout} should be rejected");
        }

        // too large for a Duration
        assert!(matches!(
            parse_site("host: example.com\ntimeout: 1e20\n"),
            Err(ConfigError::InvalidField { field, .. }) if field == "timeout"
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            parse_site("host: [unclosed"),
            Err(ConfigError::Syntax(_))
        ));
    }

    #[test]
    fn test_bad_check_only_invalidates_its_branch() {
        let site = parse_site(
            r#"
host: www.example.pl
checks:
  - request: /
    response: [ValidResponse]
  - request: 42
  - request: /x
    response: [ValidNothing]
"#,
        )
        .unwrap();

        assert_eq!(site.checks.len(), 3);
        assert!(matches!(site.checks[0], CheckSlot::Valid(_)));
        assert!(matches!(
            &site.checks[1],
            CheckSlot::Invalid { error: ConfigError::InvalidRequest(_), .. }
        ));
        assert!(matches!(
            &site.checks[2],
            CheckSlot::Invalid { request, error: ConfigError::UnknownOperation(_) } if request == "\"/x\""
        ));
    }

    #[test]
    fn test_check_node_fields() {
        let site = parse_site(
            r#"
host: www.example.pl
checks:
  - title: Home page
    danger: 3
    request:
      src: /index.html
      method: POST
      headers:
        Accept: text/html
    response:
      - ValidResponse
    checks:
      - request: /favicon.ico
"#,
        )
        .unwrap();

        let CheckSlot::Valid(node) = &site.checks[0] else {
            panic!("expected a valid check");
        };
        assert_eq!(node.title.as_deref(), Some("Home page"));
        assert_eq!(node.danger, 3);
        assert_eq!(node.response.len(), 1);
        assert_eq!(node.checks.len(), 1);
        match &node.request {
            RequestSpec::Structured {
                src,
                method,
                headers,
            } => {
                assert_eq!(src, &Some(RequestSource::Path("/index.html".into())));
                assert_eq!(method, &Some(HttpMethod::Post));
                assert_eq!(headers["accept"], "text/html");
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn test_reader_source_is_recognized() {
        let site = parse_site(
            "host: www.example.pl\nchecks:\n  - request: {src: ParseHTML}\n",
        )
        .unwrap();
        let CheckSlot::Valid(node) = &site.checks[0] else {
            panic!("expected a valid check");
        };
        assert_eq!(
            node.request,
            RequestSpec::Structured {
                src: Some(RequestSource::Reader(ReaderKind::Html)),
                method: None,
                headers: Headers::new(),
            }
        );
    }

    #[test]
    fn test_nesting_limit() {
        let mut doc = String::from("host: www.example.pl\nchecks:\n");
        let mut indent = String::from("  ");
        for _ in 0..=MAX_CHECK_DEPTH + 1 {
            doc.push_str(&format!("{indent}- request: /\n{indent}  checks:\n"));
            indent.push_str("    ");
        }
        doc.push_str(&format!("{indent}- request: /leaf\n"));

        let site = parse_site(&doc).unwrap();

        // The branch whose children cross the limit is rejected, ancestors stay valid
        let mut slot = &site.checks[0];
        let mut depth = 0;
        while let CheckSlot::Valid(node) = slot {
            slot = &node.checks[0];
            depth += 1;
        }
        assert_eq!(depth, MAX_CHECK_DEPTH);
        assert!(matches!(
            slot,
            CheckSlot::Invalid { error: ConfigError::TooDeep(_), .. }
        ));
    }
}
