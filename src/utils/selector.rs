//! CSS selector parsing utilities.

use std::sync::LazyLock;

use scraper::Selector;

static MATCH_NOTHING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("*:not(*)").expect("fallback selector is valid"));

/// Parses a CSS selector with a safe fallback.
///
/// Selectors from site documents are validated when the document is loaded,
/// so a failure here means the selector text changed after loading. The error
/// is logged and a selector matching nothing is returned, which the caller
/// then reports as an empty match.
///
/// # Arguments
///
/// * `selector_str` - The CSS selector string to parse
/// * `context` - Context description for error logging (e.g. the reader name)
pub fn parse_selector_with_fallback(selector_str: &str, context: &str) -> Selector {
    Selector::parse(selector_str).unwrap_or_else(|e| {
        log::error!(
            "Failed to parse CSS selector '{}' in {}: {}. Using fallback selector.",
            selector_str,
            context,
            e
        );
        MATCH_NOTHING.clone()
    })
}
