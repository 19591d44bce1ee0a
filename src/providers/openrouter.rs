//! OpenRouter credit collector.
//!
//! OpenRouter only reports a running spend per key, so this collector yields a
//! provider total rather than usage records.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::Value;

use crate::core::collector::{Collected, Collector};
use crate::core::http::{VENDOR_TIMEOUT, build_client, fetch_json_with_bearer};
use crate::core::models::ProviderTotal;
use crate::core::normalize::parse_openrouter_key;
use crate::error::{MeterError, Result};

pub const SOURCE_OPENROUTER: &str = "openrouter";

/// OpenRouter API base URL.
pub const API_BASE: &str = "https://openrouter.ai";

#[derive(Debug, Clone)]
pub struct OpenRouterCollector {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenRouterCollector {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, API_BASE)
    }

    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(VENDOR_TIMEOUT)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Current spend and remaining credit for the key.
    ///
    /// # Errors
    ///
    /// Network, status and body errors.
    pub async fn fetch_total(&self) -> Result<ProviderTotal> {
        let url = format!("{}/api/v1/auth/key", self.base_url);
        let body: Value =
            fetch_json_with_bearer(&self.client, &url, &self.api_key, VENDOR_TIMEOUT).await?;
        parse_openrouter_key(&body)
            .ok_or_else(|| MeterError::ParseResponse("key body missing data.usage".to_string()))
    }
}

impl Collector for OpenRouterCollector {
    fn name(&self) -> &'static str {
        SOURCE_OPENROUTER
    }

    fn timeout(&self) -> Duration {
        VENDOR_TIMEOUT
    }

    fn fetch(&self) -> BoxFuture<'_, Result<Collected>> {
        Box::pin(async move { Ok(Collected::total(self.fetch_total().await?)) })
    }
}
