//! Remote metering server collector.
//!
//! The server exposes pre-aggregated usage, session state and OAuth quota.
//! When it answers its health probe it is the only source used for a cycle.
//!
//! Endpoints: `/api/health`, `/api/usage`, `/api/sessions`, `/api/oauth`.

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;

use crate::core::http::{HEALTH_TIMEOUT, REMOTE_TIMEOUT, build_client, fetch_json, probe};
use crate::core::models::{OAuthQuotaSnapshot, SessionState};
use crate::core::normalize::{
    RemoteUsage, parse_remote_oauth, parse_remote_sessions, parse_remote_usage,
};
use crate::error::{MeterError, Result};

pub const SOURCE_REMOTE_USAGE: &str = "remote-usage";
pub const SOURCE_REMOTE_SESSIONS: &str = "remote-sessions";
pub const SOURCE_REMOTE_OAUTH: &str = "remote-oauth";

/// Client for one remote metering server.
#[derive(Debug, Clone)]
pub struct RemoteCollector {
    client: Client,
    base_url: String,
}

impl RemoteCollector {
    /// Create a collector for `base_url` (trailing slash ignored).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(REMOTE_TIMEOUT)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Whether `/api/health` answers 200 within the health timeout.
    pub async fn check_health(&self) -> bool {
        probe(&self.client, &self.url("/api/health"), HEALTH_TIMEOUT).await
    }

    /// Fetch usage records.
    ///
    /// # Errors
    ///
    /// Network, status and body errors; a body missing `records` or
    /// `hasClawdbot` is a payload error.
    pub async fn fetch_usage(&self) -> Result<RemoteUsage> {
        let body: Value = fetch_json(&self.client, &self.url("/api/usage")).await?;
        parse_remote_usage(&body).ok_or_else(|| {
            MeterError::ParseResponse("usage body missing records or hasClawdbot".to_string())
        })
    }

    /// Fetch active sessions.
    ///
    /// # Errors
    ///
    /// Network, status and body errors.
    pub async fn fetch_sessions(&self) -> Result<Vec<SessionState>> {
        let body: Value = fetch_json(&self.client, &self.url("/api/sessions")).await?;
        Ok(parse_remote_sessions(&body, Utc::now()))
    }

    /// Fetch the OAuth quota. `Ok(None)` when the server reports an error.
    ///
    /// # Errors
    ///
    /// Network, status and body errors.
    pub async fn fetch_oauth(&self) -> Result<Option<OAuthQuotaSnapshot>> {
        let body: Value = fetch_json(&self.client, &self.url("/api/oauth")).await?;
        Ok(parse_remote_oauth(&body))
    }
}
