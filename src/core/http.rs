//! HTTP client utilities.
//!
//! Provides the shared HTTP client and JSON helpers for all remote collectors.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, RequestBuilder};

use crate::error::{MeterError, Result};

/// Timeout for remote usage, sessions and OAuth requests.
pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the remote health probe.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for metered vendor APIs.
pub const VENDOR_TIMEOUT: Duration = Duration::from_secs(15);

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(format!("agent-meter/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| MeterError::Network(e.to_string()))
}

/// Fetch JSON from a URL.
///
/// # Errors
///
/// Returns error on network failure, non-success status or JSON parse failure.
pub async fn fetch_json<T: serde::de::DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    send_json(client.get(url), url, REMOTE_TIMEOUT).await
}

/// Fetch JSON from a URL with a bearer token.
///
/// # Errors
///
/// Same as [`fetch_json`].
pub async fn fetch_json_with_bearer<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    token: &str,
    timeout: Duration,
) -> Result<T> {
    send_json(
        client.get(url).bearer_auth(token).timeout(timeout),
        url,
        timeout,
    )
    .await
}

/// GET a URL and report whether it answered 200.
pub async fn probe(client: &Client, url: &str, timeout: Duration) -> bool {
    match client.get(url).timeout(timeout).send().await {
        Ok(response) => response.status() == reqwest::StatusCode::OK,
        Err(e) => {
            tracing::debug!(url, error = %e, "probe failed");
            false
        }
    }
}

async fn send_json<T: serde::de::DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
    timeout: Duration,
) -> Result<T> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            MeterError::Timeout {
                source_name: url.to_string(),
                seconds: timeout.as_secs(),
            }
        } else {
            MeterError::Network(e.to_string())
        }
    })?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(MeterError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    response
        .json()
        .await
        .map_err(|e| MeterError::ParseResponse(e.to_string()))
}
