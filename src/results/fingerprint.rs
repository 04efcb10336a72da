//! Stable identity of a request across runs.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::fetch::{Headers, HttpMethod};

/// SHA-256 (hex) over `"{METHOD} {url}\n"` followed by the request headers as
/// `name=value` lines, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(method: HttpMethod, url: &Url, headers: &Headers) -> Self {
        let mut lines: Vec<String> = headers
            .iter()
            .map(|(name, value)| format!("{}={}", name.to_ascii_lowercase(), value))
            .collect();
        lines.sort();

        let mut hasher = Sha256::new();
        hasher.update(format!("{method} {url}\n"));
        hasher.update(lines.join("\n"));
        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let fp = Fingerprint::compute(HttpMethod::Get, &url("https://example.com/"), &Headers::new());
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_stable_and_discriminating() {
        let mut headers = Headers::new();
        headers.insert("accept".into(), "text/html".into());

        let a = Fingerprint::compute(HttpMethod::Get, &url("https://example.com/"), &headers);
        let b = Fingerprint::compute(HttpMethod::Get, &url("https://example.com/"), &headers.clone());
        assert_eq!(a, b);

        let other_method = Fingerprint::compute(HttpMethod::Post, &url("https://example.com/"), &headers);
        let other_url = Fingerprint::compute(HttpMethod::Get, &url("https://example.com/x"), &headers);
        let no_headers = Fingerprint::compute(HttpMethod::Get, &url("https://example.com/"), &Headers::new());
        assert_ne!(a, other_method);
        assert_ne!(a, other_url);
        assert_ne!(a, no_headers);
    }

    #[test]
    fn test_fingerprint_tracks_header_values_not_order() {
        let target = url("https://example.com/api");
        let mut headers = Headers::new();
        headers.insert("accept".into(), "application/json".into());
        headers.insert("x-tenant".into(), "blue".into());
        let base = Fingerprint::compute(HttpMethod::Get, &target, &headers);

        let mut changed = headers.clone();
        changed.insert("x-tenant".into(), "green".into());
        assert_ne!(base, Fingerprint::compute(HttpMethod::Get, &target, &changed));

        let mut reordered = Headers::new();
        reordered.insert("X-Tenant".into(), "blue".into());
        reordered.insert("Accept".into(), "application/json".into());
        assert_eq!(base, Fingerprint::compute(HttpMethod::Get, &target, &reordered));
    }
}
