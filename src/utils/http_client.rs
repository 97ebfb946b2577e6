// ABOUTME: Shared HTTP client construction with timeout profiles for token and API calls
// ABOUTME: Token exchanges use short timeouts, resource requests use longer configurable ones

use crate::constants::http;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Create a new HTTP client with custom timeout settings
///
/// # Arguments
/// * `timeout_secs` - Request timeout in seconds
/// * `connect_timeout_secs` - Connection timeout in seconds
///
/// # Returns
/// A new `reqwest::Client`; falls back to a default client if the builder fails
#[must_use]
pub fn create_client_with_timeout(timeout_secs: u64, connect_timeout_secs: u64) -> Client {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .user_agent(concat!("tredict-client/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Create a new HTTP client optimized for OAuth flows
///
/// Token exchanges should be fast, so this client has shorter timeouts.
#[must_use]
pub fn oauth_client() -> Client {
    create_client_with_timeout(http::OAUTH_TIMEOUT_SECS, http::OAUTH_CONNECT_TIMEOUT_SECS)
}

/// Create a new HTTP client for API calls
#[must_use]
pub fn api_client(timeout_secs: u64, connect_timeout_secs: u64) -> Client {
    create_client_with_timeout(timeout_secs, connect_timeout_secs)
}
