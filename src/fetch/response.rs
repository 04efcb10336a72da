//! Per-request response state shared by the validator pipeline.

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use url::Url;

/// Ephemeral state of one performed request.
///
/// `content` is owned and mutable: validators such as `UnGzip` replace it and
/// every following operation of the same node sees the new buffer.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    /// Effective URL, after redirects
    pub url: Url,
    pub status: u16,
    pub headers: HeaderMap,
    pub content: Vec<u8>,
}

impl ResponseContext {
    pub fn new(url: Url, status: u16, headers: HeaderMap, content: Vec<u8>) -> Self {
        Self {
            url,
            status,
            headers,
            content,
        }
    }

    /// Returns a header value as text, lossily decoded when it isn't ASCII.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
    }

    /// Returns the `Content-Type` header, or an empty string when absent.
    pub fn content_type(&self) -> String {
        self.headers
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default()
    }

    /// Response headers as `(name, value)` pairs sorted by name.
    pub fn sorted_headers(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        pairs.sort();
        pairs
    }
}
