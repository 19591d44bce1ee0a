//! OpenAI usage collector.
//!
//! Tries the per-model usage endpoint first and falls back to the billing
//! endpoint (a single month-to-date total) when it answers non-200.

use std::time::Duration;

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::Value;

use crate::core::collector::{Collected, Collector};
use crate::core::http::{VENDOR_TIMEOUT, build_client, fetch_json_with_bearer};
use crate::core::models::UsageRecord;
use crate::core::normalize::{parse_openai_billing, parse_openai_usage};
use crate::core::pricing::PricingTable;
use crate::error::{MeterError, Result};

pub const SOURCE_OPENAI: &str = "openai";

/// OpenAI API base URL.
pub const API_BASE: &str = "https://api.openai.com";

/// Collector for one OpenAI API key.
#[derive(Debug, Clone)]
pub struct OpenAiCollector {
    client: Client,
    base_url: String,
    api_key: String,
    pricing: PricingTable,
}

impl OpenAiCollector {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, API_BASE)
    }

    /// Point the collector at another base URL (proxies, tests).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(VENDOR_TIMEOUT)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            pricing: PricingTable::current(),
        })
    }

    /// Month-to-date records, falling back to the billing total.
    ///
    /// # Errors
    ///
    /// Fails when both endpoints fail.
    pub async fn fetch_month(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<Vec<UsageRecord>> {
        let month_start = today.with_day(1).unwrap_or(today);

        let usage_url = format!(
            "{}/v1/usage?date={}",
            self.base_url,
            month_start.format("%Y-%m-%d")
        );
        match fetch_json_with_bearer::<Value>(&self.client, &usage_url, &self.api_key, VENDOR_TIMEOUT)
            .await
        {
            Ok(body) => return Ok(parse_openai_usage(&body, &self.pricing, now)),
            Err(MeterError::HttpStatus { status, .. }) => {
                tracing::debug!(status, "usage endpoint refused, trying billing endpoint");
            }
            Err(e) => return Err(e),
        }

        let billing_url = format!(
            "{}/dashboard/billing/usage?start_date={}&end_date={}",
            self.base_url,
            month_start.format("%Y-%m-%d"),
            today.format("%Y-%m-%d")
        );
        let body: Value =
            fetch_json_with_bearer(&self.client, &billing_url, &self.api_key, VENDOR_TIMEOUT)
                .await?;
        parse_openai_billing(&body, now)
            .map(|record| vec![record])
            .ok_or_else(|| MeterError::ParseResponse("billing body missing total_usage".to_string()))
    }
}

impl Collector for OpenAiCollector {
    fn name(&self) -> &'static str {
        SOURCE_OPENAI
    }

    fn timeout(&self) -> Duration {
        // Two sequential calls in the fallback path.
        VENDOR_TIMEOUT * 2
    }

    fn fetch(&self) -> BoxFuture<'_, Result<Collected>> {
        Box::pin(async move {
            let now = Utc::now();
            let today = now.with_timezone(&Local).date_naive();
            Ok(Collected::records(self.fetch_month(today, now).await?))
        })
    }
}
