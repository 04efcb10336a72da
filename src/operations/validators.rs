//! Response validators.

use std::io::Read;

use flate2::read::GzDecoder;
use serde_yaml::{Mapping, Value};

use super::headers::{check_headers, content_types_match};
use super::image::{is_image_content_type, ImageRule};
use crate::config::{as_unsigned, describe, unknown_keys, DEFAULT_VALID_STATUSES};
use crate::error_handling::{ConfigError, ValidationFailure};
use crate::fetch::ResponseContext;

const XML_CONTENT_TYPES: &[&str] = &["application/xml", "text/xml"];
const GZIP_CONTENT_TYPE: &str = "application/octet-stream";

/// A validator with its parsed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    /// Status must be one of `statuses`
    ValidResponse { statuses: Vec<u16> },
    /// `image/*` content decoding to an image matching the rule
    ValidImage(ImageRule),
    /// Body length bounds, in bytes
    ValidContent {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    /// `text/*` content
    ValidText,
    /// `application/xml` or `text/xml` content
    ValidXml,
    /// Gunzips `application/octet-stream` content in place
    UnGzip,
    /// `image/*` content; the body is not decoded
    ValidFavicon,
    /// Every non-comment line is a `field: value` record
    ValidRobotsTxt,
    /// Headers present with the given values
    HasHeaders(Vec<(String, String)>),
}

impl Validator {
    pub fn parse(name: &str, params: &Mapping) -> Result<Self, ConfigError> {
        let validator = match name {
            "ValidResponse" => {
                expect_params(name, params, &["status"])?;
                let statuses = match params.get("status") {
                    None | Some(Value::Null) => DEFAULT_VALID_STATUSES.to_vec(),
                    Some(Value::Sequence(items)) => items
                        .iter()
                        .map(|s| status_code(name, s))
                        .collect::<Result<_, _>>()?,
                    Some(single) => vec![status_code(name, single)?],
                };
                Validator::ValidResponse { statuses }
            }
            "ValidImage" => {
                expect_params(name, params, &["min_size", "format"])?;
                let min_size = text_param(name, params, "min_size")?
                    .map(|s| ImageRule::parse_min_size(&s))
                    .transpose()?;
                let format = text_param(name, params, "format")?
                    .map(|s| ImageRule::parse_format(&s))
                    .transpose()?;
                Validator::ValidImage(ImageRule { min_size, format })
            }
            "ValidContent" => {
                expect_params(name, params, &["min_length", "max_length"])?;
                let min_length = length_param(name, params, "min_length")?;
                let max_length = length_param(name, params, "max_length")?;
                if let (Some(min), Some(max)) = (min_length, max_length) {
                    if min > max {
                        return Err(invalid(name, format!("min_length {min} exceeds max_length {max}")));
                    }
                }
                Validator::ValidContent {
                    min_length,
                    max_length,
                }
            }
            "ValidText" => no_params(name, params, Validator::ValidText)?,
            "ValidXML" => no_params(name, params, Validator::ValidXml)?,
            "UnGzip" => no_params(name, params, Validator::UnGzip)?,
            "ValidFavicon" => no_params(name, params, Validator::ValidFavicon)?,
            "ValidRobotsTxt" => no_params(name, params, Validator::ValidRobotsTxt)?,
            "HasHeaders" => {
                expect_params(name, params, &["headers"])?;
                let headers = params
                    .get("headers")
                    .ok_or_else(|| invalid(name, "headers is required"))?;
                Validator::HasHeaders(parse_expected_headers(name, headers)?)
            }
            other => return Err(ConfigError::UnknownOperation(other.to_string())),
        };
        Ok(validator)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Validator::ValidResponse { .. } => "ValidResponse",
            Validator::ValidImage(_) => "ValidImage",
            Validator::ValidContent { .. } => "ValidContent",
            Validator::ValidText => "ValidText",
            Validator::ValidXml => "ValidXML",
            Validator::UnGzip => "UnGzip",
            Validator::ValidFavicon => "ValidFavicon",
            Validator::ValidRobotsTxt => "ValidRobotsTxt",
            Validator::HasHeaders(_) => "HasHeaders",
        }
    }

    /// Runs the validator; `UnGzip` replaces `response.content` on success.
    pub fn validate(&self, response: &mut ResponseContext) -> Result<(), ValidationFailure> {
        match self {
            Validator::ValidResponse { statuses } => {
                if statuses.contains(&response.status) {
                    Ok(())
                } else {
                    Err(ValidationFailure::new(format!(
                        "Invalid response status: {}",
                        response.status
                    )))
                }
            }
            Validator::ValidImage(rule) => {
                rule.check(&response.content_type(), &response.content)
            }
            Validator::ValidContent {
                min_length,
                max_length,
            } => {
                let length = response.content.len();
                if min_length.is_some_and(|min| length < min) {
                    return Err(ValidationFailure::new(format!(
                        "Content too short: {length} bytes"
                    )));
                }
                if max_length.is_some_and(|max| length > max) {
                    return Err(ValidationFailure::new(format!(
                        "Content too long: {length} bytes"
                    )));
                }
                Ok(())
            }
            Validator::ValidText => {
                let content_type = response.content_type();
                let is_text = content_type
                    .trim_start()
                    .get(..5)
                    .is_some_and(|p| p.eq_ignore_ascii_case("text/"));
                if is_text {
                    Ok(())
                } else {
                    Err(invalid_content_type(&content_type))
                }
            }
            Validator::ValidXml => {
                let content_type = response.content_type();
                if !XML_CONTENT_TYPES
                    .iter()
                    .any(|expected| content_types_match(expected, &content_type))
                {
                    return Err(invalid_content_type(&content_type));
                }
                Ok(())
            }
            Validator::UnGzip => {
                let content_type = response.content_type();
                if !content_types_match(GZIP_CONTENT_TYPE, &content_type) {
                    return Err(invalid_content_type(&content_type));
                }
                let mut decoded = Vec::new();
                GzDecoder::new(response.content.as_slice())
                    .read_to_end(&mut decoded)
                    .map_err(|e| ValidationFailure::new(format!("Cannot gunzip content: {e}")))?;
                response.content = decoded;
                Ok(())
            }
            Validator::ValidFavicon => {
                let content_type = response.content_type();
                if is_image_content_type(&content_type) {
                    Ok(())
                } else {
                    Err(invalid_content_type(&content_type))
                }
            }
            Validator::ValidRobotsTxt => check_robots_txt(&response.content),
            Validator::HasHeaders(expected) => check_headers(expected, &response.headers),
        }
    }
}

fn invalid(operation: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameters {
        operation: operation.to_string(),
        message: message.into(),
    }
}

fn invalid_content_type(content_type: &str) -> ValidationFailure {
    ValidationFailure::new(format!("Invalid content type: {content_type:?}"))
}

fn expect_params(name: &str, params: &Mapping, allowed: &[&str]) -> Result<(), ConfigError> {
    let unknown = unknown_keys(params, allowed);
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(invalid(name, format!("unexpected parameters {}", unknown.join(", "))))
    }
}

fn no_params(name: &str, params: &Mapping, validator: Validator) -> Result<Validator, ConfigError> {
    expect_params(name, params, &[])?;
    Ok(validator)
}

fn status_code(name: &str, value: &Value) -> Result<u16, ConfigError> {
    as_unsigned(value)
        .and_then(|s| u16::try_from(s).ok())
        .filter(|s| (100..=599).contains(s))
        .ok_or_else(|| invalid(name, format!("invalid status {}", describe(value))))
}

fn text_param(name: &str, params: &Mapping, key: &str) -> Result<Option<String>, ConfigError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(invalid(name, format!("{key} must be text, got {}", describe(other)))),
    }
}

fn length_param(name: &str, params: &Mapping, key: &str) -> Result<Option<usize>, ConfigError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => as_unsigned(value)
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(name, format!("{key} must be a byte count, got {}", describe(value)))),
    }
}

fn parse_expected_headers(name: &str, value: &Value) -> Result<Vec<(String, String)>, ConfigError> {
    let headers = crate::config::parse_headers(value)
        .map_err(|_| invalid(name, format!("headers must be a mapping, got {}", describe(value))))?;

    if let Some(content_type) = headers.get("content-type") {
        if content_type.parse::<mime::Mime>().is_err() {
            return Err(invalid(name, format!("invalid content-type {content_type:?}")));
        }
    }
    Ok(headers.into_iter().collect())
}

fn check_robots_txt(content: &[u8]) -> Result<(), ValidationFailure> {
    let text = String::from_utf8_lossy(content);
    for (number, line) in text.lines().enumerate() {
        let record = line.split('#').next().unwrap_or("").trim();
        if record.is_empty() {
            continue;
        }
        let valid = record
            .split_once(':')
            .is_some_and(|(field, _)| !field.trim().is_empty() && !field.trim().contains(' '));
        if !valid {
            return Err(ValidationFailure::new(format!(
                "Invalid robots.txt line {}: {record:?}",
                number + 1
            )));
        }
    }
    Ok(())
}
