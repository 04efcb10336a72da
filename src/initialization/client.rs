//! HTTP client initialization.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::DEFAULT_USER_AGENT;
use crate::error_handling::InitializationError;

/// Initializes the HTTP client used for one site's checks.
///
/// `timeout` bounds both connecting and each read, matching the site's
/// `timeout` setting. Redirects are followed (reqwest's default policy of up
/// to 10 hops) so validators see the final response. A `user-agent` header
/// configured on the site or request overrides the default one set here.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if the TLS backend cannot be
/// initialized.
pub fn init_client(timeout: Duration) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .user_agent(DEFAULT_USER_AGENT)
        .build()?;
    Ok(client)
}
