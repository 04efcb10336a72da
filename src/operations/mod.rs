//! Response operations: validators and readers.
//!
//! Each check node carries an ordered list of operations. Validators judge the
//! response (and may transform its content, see `UnGzip`); readers parse the
//! content and extract URLs that become the base of nested checks.
//!
//! An operation is written either as a bare name (`- ValidResponse`) or as a
//! mapping whose `validator` or `reader` key names it, with the remaining keys
//! as parameters:
//!
//! ```yaml
//! response:
//!   - ValidResponse
//!   - validator: ValidImage
//!     min_size: 100x100
//!   - reader: ParseHTML
//!     query:
//!       selector: link[rel=icon]
//!       action: ReadProperty
//!       property: href
//! ```

mod headers;
mod image;
mod readers;
mod validators;

use serde_yaml::{Mapping, Value};

use crate::config::describe;
use crate::error_handling::ConfigError;

pub use headers::content_types_match;
pub use image::ImageRule;
pub use readers::{Extraction, ReadAction, Reader, ReaderKind, SelectorQuery};
pub use validators::Validator;

/// One entry of a check node's `response` list.
#[derive(Debug, Clone)]
pub enum Operation {
    Validate(Validator),
    Read(Reader),
}

impl Operation {
    /// Parses an operation found in a check at nesting `depth`.
    ///
    /// # Errors
    ///
    /// `UnknownOperation` for names outside the supported set, and
    /// `InvalidParameters`/`InvalidSelector`/`MissingSelectors` when the
    /// parameters don't fit the operation.
    pub fn from_value(value: &Value, depth: usize) -> Result<Self, ConfigError> {
        let empty = Mapping::new();
        let (name, params) = match value {
            Value::String(name) => (name.as_str(), &empty),
            Value::Mapping(map) => {
                if let Some(name) = map.get("validator").and_then(Value::as_str) {
                    return Ok(Operation::Validate(Validator::parse(
                        name,
                        &without_key(map, "validator"),
                    )?));
                }
                match map.get("reader").and_then(Value::as_str) {
                    Some(name) => (name, map),
                    None => return Err(ConfigError::UnknownOperation(describe(value))),
                }
            }
            other => return Err(ConfigError::UnknownOperation(describe(other))),
        };

        match ReaderKind::from_name(name) {
            Some(kind) => Ok(Operation::Read(Reader::parse(
                kind,
                &without_key(params, "reader"),
                depth,
            )?)),
            None => Ok(Operation::Validate(Validator::parse(name, params)?)),
        }
    }

    /// Name used in reports, e.g. `ValidImage` or `ParseHTML("link[rel=icon]")`.
    pub fn name(&self) -> String {
        match self {
            Operation::Validate(validator) => validator.name().to_string(),
            Operation::Read(reader) => reader.name(),
        }
    }
}

fn without_key(map: &Mapping, key: &str) -> Mapping {
    map.iter()
        .filter(|(k, _)| k.as_str() != Some(key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
