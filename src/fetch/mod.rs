//! HTTP transport for checks.
//!
//! Issues one resolved request and captures the effective URL, status,
//! headers and the body (streamed, with a size cap).

mod request;
mod response;

use futures::StreamExt;

use crate::config::MAX_RESPONSE_BODY_SIZE;
use crate::error_handling::TransportError;

pub use request::{
    join_url, resolve_requests, CheckRequest, Headers, HttpMethod, RequestId, RequestSource,
    RequestSpec, ResolvedRequest, Scope,
};
pub use response::ResponseContext;

/// Performs a request and reads the whole response.
///
/// Redirects are followed by the client, so `ResponseContext::url` is the
/// final URL. Any status code is a successful transport outcome; judging the
/// status is left to validators.
///
/// # Errors
///
/// Returns `TransportError::Timeout` when the connection or a read times out,
/// `TransportError::BodyTooLarge` when the body exceeds
/// `MAX_RESPONSE_BODY_SIZE`, and `TransportError::Request` for any other
/// network failure.
pub async fn perform(
    client: &reqwest::Client,
    request: &CheckRequest,
) -> Result<ResponseContext, TransportError> {
    let mut builder = client.request(request.method.into(), request.url.clone());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let response = builder.send().await?;
    let url = response.url().clone();
    let status = response.status().as_u16();
    let headers = response.headers().clone();

    let content = stream_body_with_limit(response, MAX_RESPONSE_BODY_SIZE).await?;
    log::debug!(
        "{} {} -> {} ({} bytes)",
        request.method,
        url,
        status,
        content.len()
    );

    Ok(ResponseContext::new(url, status, headers, content))
}

async fn stream_body_with_limit(
    response: reqwest::Response,
    max_size: usize,
) -> Result<Vec<u8>, TransportError> {
    if let Some(length) = response.content_length() {
        if length as usize > max_size {
            return Err(TransportError::BodyTooLarge { limit: max_size });
        }
    }

    let mut stream = response.bytes_stream();
    let mut buf = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > max_size {
            return Err(TransportError::BodyTooLarge { limit: max_size });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf)
}
