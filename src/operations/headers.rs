//! `HasHeaders` matching.

use mime::Mime;
use reqwest::header::HeaderMap;

use crate::error_handling::ValidationFailure;

/// Compares two content types structurally.
///
/// Type and subtype must be equal (case-insensitively) and every parameter of
/// `expected` must be present in `actual` with the same value. Extra
/// parameters on `actual` are fine, so `text/html` matches
/// `text/html; charset=utf-8`.
pub fn content_types_match(expected: &str, actual: &str) -> bool {
    let (Ok(expected), Ok(actual)) = (expected.parse::<Mime>(), actual.parse::<Mime>()) else {
        return false;
    };

    if !expected
        .type_()
        .as_str()
        .eq_ignore_ascii_case(actual.type_().as_str())
        || !expected
            .subtype()
            .as_str()
            .eq_ignore_ascii_case(actual.subtype().as_str())
    {
        return false;
    }

    expected.params().all(|(name, value)| {
        actual.params().any(|(actual_name, actual_value)| {
            actual_name.as_str().eq_ignore_ascii_case(name.as_str())
                && actual_value.as_str().eq_ignore_ascii_case(value.as_str())
        })
    })
}

/// Checks that every expected header is present with the expected value.
///
/// `content-type` is compared with [`content_types_match`], other headers
/// exactly.
pub(crate) fn check_headers(
    expected: &[(String, String)],
    actual: &HeaderMap,
) -> Result<(), ValidationFailure> {
    for (name, value) in expected {
        let found = actual
            .get(name.as_str())
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        let Some(found) = found else {
            return Err(ValidationFailure::new(format!("Missing header {name}")));
        };

        let matches = if name == "content-type" {
            content_types_match(value, &found)
        } else {
            &found == value
        };
        if !matches {
            return Err(ValidationFailure::new(format!(
                "Invalid header value {name}: {found:?}, expected {value:?}"
            )));
        }
    }
    Ok(())
}
