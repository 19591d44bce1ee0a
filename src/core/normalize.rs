//! Per-source payload normalizers.
//!
//! Each source kind has a raw serde shape with an explicit default per field.
//! Bodies are decoded as JSON first (not JSON is an error), then item by item
//! into the raw shape: an item that does not fit is skipped on its own, the
//! rest of the payload still counts.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::models::{
    ExtraUsage, OAuthQuotaSnapshot, PRIMARY_PROVIDER, ProviderTotal, QuotaWindow, SessionState,
    UsageRecord,
};
use crate::core::pricing::PricingTable;
use crate::error::{MeterError, Result};
use crate::util::time::parse_iso8601;
use chrono::{DateTime, Utc};

pub const OPENAI_PROVIDER: &str = "OpenAI";
pub const OPENAI_AGENT: &str = "ChatGPT";
pub const OPENROUTER_PROVIDER: &str = "OpenRouter";

/// Parse a raw body into JSON, mapping failures to a payload error.
pub fn parse_body(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| MeterError::ParseResponse(e.to_string()))
}

fn decode<T: DeserializeOwned>(value: &Value) -> Option<T> {
    T::deserialize(value).ok()
}

fn parse_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(parse_iso8601)
}

// =============================================================================
// Local agent logs
// =============================================================================

/// Cheap substring check run before any JSON parsing.
#[must_use]
pub fn is_candidate_line(line: &str) -> bool {
    line.contains("\"usage\"") && line.contains("\"cost\"")
}

/// One line of an agent session log.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogLine {
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<LogMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogMessage {
    pub model: Option<String>,
    pub usage: Option<LogUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogUsage {
    pub input: Option<i64>,
    pub output: Option<i64>,
    pub cache_read: Option<i64>,
    pub cache_write: Option<i64>,
    pub cost: Option<LogCost>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogCost {
    pub total: Option<f64>,
}

impl LogLine {
    /// Decode a JSON object into a log line. None when the shape does not fit.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        decode(value)
    }

    /// Summarization event marker.
    #[must_use]
    pub fn is_compaction(&self) -> bool {
        self.kind.as_deref() == Some("compaction")
    }

    /// Flattened usage; missing parts count as zero.
    #[must_use]
    pub fn usage(&self) -> LineUsage {
        let message = self.message.as_ref();
        let usage = message.and_then(|m| m.usage.as_ref());

        LineUsage {
            model: message.and_then(|m| m.model.clone()),
            input: usage.and_then(|u| u.input).unwrap_or(0),
            output: usage.and_then(|u| u.output).unwrap_or(0),
            cache_read: usage.and_then(|u| u.cache_read).unwrap_or(0),
            cache_write: usage.and_then(|u| u.cache_write).unwrap_or(0),
            cost: usage
                .and_then(|u| u.cost.as_ref())
                .and_then(|c| c.total)
                .unwrap_or(0.0),
            timestamp: parse_time(self.timestamp.as_deref()),
        }
    }
}

/// Token counts and cost carried by one log line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineUsage {
    pub model: Option<String>,
    pub input: i64,
    pub output: i64,
    pub cache_read: i64,
    pub cache_write: i64,
    pub cost: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl LineUsage {
    /// Tokens occupying the context window (output excluded).
    #[must_use]
    pub const fn context_tokens(&self) -> i64 {
        self.input + self.cache_read + self.cache_write
    }
}

/// Normalize one log line into a usage record.
///
/// `Ok(None)` means the line is JSON but carries no billable usage.
pub fn parse_log_line(line: &str, agent: &str) -> Result<Option<UsageRecord>> {
    if !is_candidate_line(line) {
        return Ok(None);
    }
    let value = parse_body(line)?;
    let Some(usage) = LogLine::from_value(&value).map(|l| l.usage()) else {
        return Ok(None);
    };
    let Some(timestamp) = usage.timestamp else {
        return Ok(None);
    };
    if usage.cost <= 0.0 {
        return Ok(None);
    }

    Ok(Some(UsageRecord {
        provider: PRIMARY_PROVIDER.to_string(),
        agent: agent.to_string(),
        input_tokens: usage.context_tokens(),
        output_tokens: usage.output,
        cost: usage.cost,
        model: usage.model.unwrap_or_else(|| "unknown".to_string()),
        timestamp,
    }))
}

// =============================================================================
// Remote server
// =============================================================================

/// Decoded `/api/usage` body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteUsage {
    pub records: Vec<UsageRecord>,
    pub has_log_source: bool,
}

#[derive(Deserialize)]
struct RawRemoteUsage {
    records: Vec<Value>,
    #[serde(rename = "hasClawdbot")]
    has_clawdbot: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRemoteRecord {
    provider: Option<String>,
    agent: Option<String>,
    model: Option<String>,
    #[serde(default)]
    input_tokens: i64,
    #[serde(default)]
    output_tokens: i64,
    #[serde(default)]
    cost: f64,
    timestamp: Option<String>,
}

/// Normalize a `/api/usage` body. Both `records` and `hasClawdbot` are required.
#[must_use]
pub fn parse_remote_usage(body: &Value) -> Option<RemoteUsage> {
    let raw: RawRemoteUsage = decode(body)?;

    let records = raw
        .records
        .iter()
        .filter_map(decode::<RawRemoteRecord>)
        .filter_map(|item| {
            Some(UsageRecord {
                timestamp: parse_time(item.timestamp.as_deref())?,
                provider: item.provider.unwrap_or_else(|| "Unknown".to_string()),
                agent: item.agent.unwrap_or_else(|| "Unknown".to_string()),
                model: item.model.unwrap_or_else(|| "unknown".to_string()),
                input_tokens: item.input_tokens,
                output_tokens: item.output_tokens,
                cost: item.cost,
            })
        })
        .collect();

    Some(RemoteUsage {
        records,
        has_log_source: raw.has_clawdbot,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRemoteSession {
    id: String,
    agent: String,
    model: String,
    context_tokens: i64,
    context_limit: i64,
    last_activity: Option<String>,
    #[serde(default)]
    message_count: i64,
    #[serde(default)]
    session_cost: f64,
    agent_id: Option<String>,
    configured_model: Option<String>,
    auth_mode: Option<String>,
    #[serde(default)]
    compactions: i64,
}

/// Normalize a `/api/sessions` body. Unparseable `lastActivity` becomes `now`.
#[must_use]
pub fn parse_remote_sessions(body: &Value, now: DateTime<Utc>) -> Vec<SessionState> {
    let Some(items) = body.get("sessions").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(decode::<RawRemoteSession>)
        .map(|item| SessionState {
            last_activity: parse_time(item.last_activity.as_deref()).unwrap_or(now),
            configured_model: item.configured_model.unwrap_or_else(|| item.model.clone()),
            agent_id: item.agent_id.unwrap_or_default(),
            auth_mode: item.auth_mode.unwrap_or_else(|| "unknown".to_string()),
            session_id: item.id,
            agent: item.agent,
            model: item.model,
            context_tokens: item.context_tokens,
            context_limit: item.context_limit,
            message_count: item.message_count,
            session_cost: item.session_cost,
            compactions: item.compactions,
        })
        .collect()
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawQuotaWindow {
    utilization: f64,
    resets_at: Option<String>,
}

impl From<RawQuotaWindow> for QuotaWindow {
    fn from(raw: RawQuotaWindow) -> Self {
        Self {
            utilization: raw.utilization,
            resets_at: parse_time(raw.resets_at.as_deref()),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawExtraUsage {
    enabled: bool,
    monthly_limit: i64,
    used_credits: f64,
    utilization: f64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawOAuth {
    session: Option<RawQuotaWindow>,
    weekly: Option<RawQuotaWindow>,
    sonnet: Option<RawQuotaWindow>,
    extra_usage: Option<RawExtraUsage>,
}

/// Normalize a `/api/oauth` body. A body carrying `error` yields nothing.
#[must_use]
pub fn parse_remote_oauth(body: &Value) -> Option<OAuthQuotaSnapshot> {
    let object = body.as_object()?;
    if object.contains_key("error") {
        return None;
    }
    let raw: RawOAuth = decode(body)?;

    Some(OAuthQuotaSnapshot {
        session: raw.session.unwrap_or_default().into(),
        weekly: raw.weekly.unwrap_or_default().into(),
        model_specific: raw.sonnet.map(QuotaWindow::from),
        extra_usage: raw.extra_usage.map(|extra| ExtraUsage {
            enabled: extra.enabled,
            monthly_limit: extra.monthly_limit,
            used_credits: extra.used_credits,
            utilization: extra.utilization,
        }),
    })
}

// =============================================================================
// Vendor APIs
// =============================================================================

#[derive(Deserialize)]
struct RawOpenAiItem {
    #[serde(default)]
    n_context_tokens_total: i64,
    #[serde(default)]
    n_generated_tokens_total: i64,
    snapshot_id: Option<String>,
}

/// Normalize an OpenAI `/v1/usage` body into priced records.
///
/// Records are stamped `now`: the endpoint reports month-to-date buckets, and
/// their own timestamps would place current spend outside today and this week.
#[must_use]
pub fn parse_openai_usage(
    body: &Value,
    pricing: &PricingTable,
    now: DateTime<Utc>,
) -> Vec<UsageRecord> {
    let Some(items) = body.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(decode::<RawOpenAiItem>)
        .map(|item| {
            let model = item.snapshot_id.unwrap_or_else(|| "gpt-4".to_string());
            let (cost, _) = pricing.cost_for(
                &model,
                item.n_context_tokens_total,
                item.n_generated_tokens_total,
            );

            UsageRecord {
                provider: OPENAI_PROVIDER.to_string(),
                agent: OPENAI_AGENT.to_string(),
                model,
                input_tokens: item.n_context_tokens_total,
                output_tokens: item.n_generated_tokens_total,
                cost,
                timestamp: now,
            }
        })
        .collect()
}

#[derive(Deserialize)]
struct RawOpenAiBilling {
    /// Cents.
    total_usage: f64,
}

/// Normalize an OpenAI billing body (`total_usage` in cents) into one record.
#[must_use]
pub fn parse_openai_billing(body: &Value, now: DateTime<Utc>) -> Option<UsageRecord> {
    let raw: RawOpenAiBilling = decode(body)?;
    Some(UsageRecord {
        provider: OPENAI_PROVIDER.to_string(),
        agent: OPENAI_AGENT.to_string(),
        model: "mixed".to_string(),
        input_tokens: 0,
        output_tokens: 0,
        cost: raw.total_usage / 100.0,
        timestamp: now,
    })
}

#[derive(Deserialize)]
struct RawOpenRouterKey {
    data: RawOpenRouterData,
}

#[derive(Deserialize)]
struct RawOpenRouterData {
    usage: f64,
    #[serde(default)]
    limit: Option<f64>,
}

/// Normalize an OpenRouter `/auth/key` body into a running total.
#[must_use]
pub fn parse_openrouter_key(body: &Value) -> Option<ProviderTotal> {
    let raw: RawOpenRouterKey = decode(body)?;
    let usage = raw.data.usage;

    Some(ProviderTotal {
        provider: OPENROUTER_PROVIDER.to_string(),
        total_cost: usage,
        remaining_credit: raw.data.limit.map(|limit| limit - usage),
    })
}
