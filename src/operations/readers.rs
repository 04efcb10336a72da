//! HTML/XML readers.
//!
//! A reader runs CSS selector queries against the response content and
//! extracts one value per matched element, either an attribute
//! (`ReadProperty`) or the element's trimmed text (`ReadContent`). Extracted
//! values are URLs for the query's nested checks.

use scraper::{Html, Selector};
use serde_yaml::{Mapping, Value};

use crate::config::{as_unsigned, describe, flag, parse_checks, unknown_keys, CheckSlot};
use crate::error_handling::{ConfigError, ValidationFailure};
use crate::utils::parse_selector_with_fallback;

/// Which parser a reader uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderKind {
    Html,
    Xml,
}

impl ReaderKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ParseHTML" => Some(ReaderKind::Html),
            "ParseXML" => Some(ReaderKind::Xml),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReaderKind::Html => "ParseHTML",
            ReaderKind::Xml => "ParseXML",
        }
    }
}

/// What a query extracts from each matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadAction {
    ReadProperty(String),
    ReadContent,
}

/// One selector query of a reader.
#[derive(Debug, Clone)]
pub struct SelectorQuery {
    pub selector: String,
    pub action: ReadAction,
    /// Zero matches is not a failure
    pub optional: bool,
    /// Only the first `limit` matches are used
    pub limit: Option<usize>,
    /// Checks run once per extracted value, rooted at that value
    pub checks: Vec<CheckSlot>,
}

/// A reader operation: its parser and its queries, in run order.
#[derive(Debug, Clone)]
pub struct Reader {
    pub kind: ReaderKind,
    pub queries: Vec<SelectorQuery>,
}

/// Values one query extracted.
#[derive(Debug)]
pub struct Extraction<'r> {
    pub query: &'r SelectorQuery,
    pub values: Vec<String>,
}

impl Reader {
    /// Parses reader parameters: `queries` (a list) and/or `query` (a single
    /// query, run after the list).
    pub fn parse(kind: ReaderKind, params: &Mapping, depth: usize) -> Result<Self, ConfigError> {
        let unknown = unknown_keys(params, &["query", "queries"]);
        if !unknown.is_empty() {
            return Err(ConfigError::InvalidParameters {
                operation: kind.name().to_string(),
                message: format!("unexpected parameters {}", unknown.join(", ")),
            });
        }

        let mut queries = Vec::new();
        match params.get("queries") {
            None | Some(Value::Null) => {}
            Some(Value::Sequence(items)) => {
                for item in items {
                    queries.push(SelectorQuery::parse(kind, item, depth)?);
                }
            }
            Some(other) => {
                return Err(ConfigError::InvalidParameters {
                    operation: kind.name().to_string(),
                    message: format!("queries must be a list, got {}", describe(other)),
                })
            }
        }
        if let Some(query) = params.get("query").filter(|q| !q.is_null()) {
            queries.push(SelectorQuery::parse(kind, query, depth)?);
        }

        if queries.is_empty() {
            return Err(ConfigError::MissingSelectors);
        }
        Ok(Self { kind, queries })
    }

    /// `ParseHTML("a.logo")`, with all selectors joined when there are several.
    pub fn name(&self) -> String {
        let selectors: Vec<String> = self
            .queries
            .iter()
            .map(|q| format!("{:?}", q.selector))
            .collect();
        format!("{}({})", self.kind.name(), selectors.join(", "))
    }

    /// Runs every query against `content`.
    ///
    /// # Errors
    ///
    /// Fails when a non-optional query matches nothing, or a `ReadProperty`
    /// query matches an element without the property.
    pub fn extract(&self, content: &[u8]) -> Result<Vec<Extraction<'_>>, ValidationFailure> {
        let text = String::from_utf8_lossy(content);
        // html5ever parses XML leniently; element names are matched case-insensitively
        let document = Html::parse_document(&text);

        self.queries
            .iter()
            .map(|query| {
                let selector = parse_selector_with_fallback(&query.selector, self.kind.name());
                let values = query.read(&document, &selector)?;
                Ok(Extraction { query, values })
            })
            .collect()
    }
}

impl SelectorQuery {
    fn parse(kind: ReaderKind, value: &Value, depth: usize) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidParameters {
            operation: kind.name().to_string(),
            message,
        };

        let map = value
            .as_mapping()
            .ok_or_else(|| invalid(format!("query must be a mapping, got {}", describe(value))))?;

        let unknown = unknown_keys(map, &["selector", "action", "property", "optional", "limit", "checks"]);
        if !unknown.is_empty() {
            return Err(invalid(format!("unexpected query keys {}", unknown.join(", "))));
        }

        let selector = map
            .get("selector")
            .and_then(Value::as_str)
            .ok_or_else(|| ConfigError::MissingField("selector".into()))?
            .to_string();
        Selector::parse(&selector).map_err(|e| ConfigError::InvalidSelector {
            selector: selector.clone(),
            message: e.to_string(),
        })?;

        let action = match map.get("action").and_then(Value::as_str) {
            Some("ReadProperty") => {
                let property = map
                    .get("property")
                    .and_then(Value::as_str)
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| invalid("ReadProperty requires a property".into()))?;
                ReadAction::ReadProperty(property.to_string())
            }
            Some("ReadContent") => ReadAction::ReadContent,
            _ => {
                return Err(ConfigError::InvalidAction(
                    map.get("action").map(describe).unwrap_or_else(|| "null".into()),
                ))
            }
        };

        let optional = flag(map, "optional")
            .ok_or_else(|| invalid("optional must be true or false".into()))?;

        let limit = match map.get("limit") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                as_unsigned(value)
                    .and_then(|n| usize::try_from(n).ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(|| invalid(format!("limit must be a positive integer, got {}", describe(value))))?,
            ),
        };

        let checks = match map.get("checks") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => parse_checks(value, depth + 1)?,
        };

        Ok(Self {
            selector,
            action,
            optional,
            limit,
            checks,
        })
    }

    fn read(&self, document: &Html, selector: &Selector) -> Result<Vec<String>, ValidationFailure> {
        let elements = document
            .select(selector)
            .take(self.limit.unwrap_or(usize::MAX));

        let mut values = Vec::new();
        for element in elements {
            match &self.action {
                ReadAction::ReadProperty(property) => {
                    let value = element.value().attr(property).ok_or_else(|| {
                        ValidationFailure::new(format!(
                            "Element matching {:?} has no attribute {property:?}",
                            self.selector
                        ))
                    })?;
                    values.push(value.trim().to_string());
                }
                ReadAction::ReadContent => {
                    values.push(element.text().collect::<String>().trim().to_string());
                }
            }
        }

        if values.is_empty() && !self.optional {
            return Err(ValidationFailure::new(format!(
                "Nothing matches {:?}",
                self.selector
            )));
        }
        Ok(values)
    }
}
