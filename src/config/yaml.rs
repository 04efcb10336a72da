//! Helpers for reading loosely-typed YAML values.

use serde_yaml::{Mapping, Value};

/// Renders a YAML value for error messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{s:?}"),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().replace('\n', " "))
            .unwrap_or_else(|_| format!("{other:?}")),
    }
}

/// Converts a scalar to text. Mappings, sequences and null yield `None`.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads a non-negative integer, accepting integral floats and numeric strings.
pub(crate) fn as_unsigned(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a boolean flag; absent means `false`.
pub(crate) fn flag(map: &Mapping, key: &str) -> Option<bool> {
    match map.get(key) {
        None | Some(Value::Null) => Some(false),
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => None,
    }
}

/// Keys of a mapping that are not in `allowed`.
pub(crate) fn unknown_keys(map: &Mapping, allowed: &[&str]) -> Vec<String> {
    map.keys()
        .filter(|k| !k.as_str().is_some_and(|k| allowed.contains(&k)))
        .map(describe)
        .collect()
}
