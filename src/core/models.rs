//! Core data models.
//!
//! These types are the canonical shapes every source is normalized into and
//! the pieces of the published [`Snapshot`]. Everything serializes camelCase so
//! the JSON output matches the remote server's wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::time::format_time_left;

/// Provider name used for records parsed from local agent logs.
pub const PRIMARY_PROVIDER: &str = "Anthropic";

// =============================================================================
// Usage Record
// =============================================================================

/// One observed usage event.
///
/// Created once by a collector and never mutated. Ordering across sources is
/// not assumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub provider: String,
    pub agent: String,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost: f64,
    pub timestamp: DateTime<Utc>,
}

impl UsageRecord {
    /// Input plus output tokens.
    #[must_use]
    pub const fn total_tokens(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }
}

/// Aggregate spend reported by a vendor that has no per-event records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTotal {
    pub provider: String,
    pub total_cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_credit: Option<f64>,
}

// =============================================================================
// Aggregates
// =============================================================================

/// Cost attributed to one agent over today's window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCost {
    pub agent: String,
    pub cost: f64,
    pub tokens: i64,
    /// Share of today's agent spend, 0-100.
    pub percentage_of_total: f64,
}

/// Spend for one provider with its per-agent breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUsage {
    pub provider: String,
    pub total_cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_credit: Option<f64>,
    #[serde(default)]
    pub agents: Vec<AgentCost>,
}

/// Today / this week / this month totals.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostWindows {
    pub today: f64,
    pub week: f64,
    pub month: f64,
}

// =============================================================================
// Session State
// =============================================================================

/// Latest known state of one agent's active conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: String,
    pub agent: String,
    #[serde(default)]
    pub agent_id: String,
    pub model: String,
    #[serde(default)]
    pub configured_model: String,
    #[serde(default)]
    pub auth_mode: String,
    pub context_tokens: i64,
    pub context_limit: i64,
    pub last_activity: DateTime<Utc>,
    pub message_count: i64,
    pub session_cost: f64,
    #[serde(default)]
    pub compactions: i64,
}

impl SessionState {
    /// Fraction of the context window in use.
    #[must_use]
    pub fn context_usage(&self) -> f64 {
        if self.context_limit <= 0 {
            return 0.0;
        }
        self.context_tokens as f64 / self.context_limit as f64
    }

    /// Usage is high enough that the provider will compact soon.
    #[must_use]
    pub fn is_near_compaction(&self) -> bool {
        self.context_usage() > 0.75
    }

    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.context_usage() > 0.90
    }

    #[must_use]
    pub fn is_oauth(&self) -> bool {
        self.auth_mode == "oauth"
    }

    /// Model to show: the configured one when known.
    #[must_use]
    pub fn display_model(&self) -> &str {
        if self.configured_model.is_empty() {
            &self.model
        } else {
            &self.configured_model
        }
    }
}

// =============================================================================
// OAuth Quota
// =============================================================================

/// One rate-limited quota window reported by the remote server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotaWindow {
    /// Percent consumed, 0-100.
    pub utilization: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<DateTime<Utc>>,
}

impl QuotaWindow {
    #[must_use]
    pub fn remaining(&self) -> f64 {
        (100.0 - self.utilization).max(0.0)
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.utilization > 50.0
    }

    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.utilization > 80.0
    }

    /// Compact countdown to reset, `"?"` when unknown.
    #[must_use]
    pub fn time_left(&self, now: DateTime<Utc>) -> String {
        self.resets_at
            .map_or_else(|| "?".to_string(), |at| format_time_left(at, now))
    }
}

/// Pay-as-you-go overflow credits on top of the subscription quota.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtraUsage {
    pub enabled: bool,
    pub monthly_limit: i64,
    pub used_credits: f64,
    pub utilization: f64,
}

/// Point-in-time subscription quota, fully replaced on each fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OAuthQuotaSnapshot {
    pub session: QuotaWindow,
    pub weekly: QuotaWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_specific: Option<QuotaWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_usage: Option<ExtraUsage>,
}

// =============================================================================
// Snapshot
// =============================================================================

/// Which side of the source split produced a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Remote,
    #[default]
    Local,
}

impl DataSource {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

/// Outcome of one collector within a refresh cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceHealth {
    pub source: String,
    pub healthy: bool,
    pub records: usize,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Today's spend against the daily limit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    pub limit: f64,
    pub percent_used: f64,
    /// Whether the alert for the current limit already fired.
    pub alert_raised: bool,
}

impl BudgetStatus {
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.percent_used >= 100.0
    }
}

/// Atomically published result of one refresh cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub data_source: DataSource,
    /// Whether an agent log tree was found (remote reports this itself).
    pub has_log_source: bool,
    pub windows: CostWindows,
    pub agent_costs: Vec<AgentCost>,
    pub providers: Vec<ProviderUsage>,
    pub sessions: Vec<SessionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_quota: Option<OAuthQuotaSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_savings: Option<crate::core::plan::PlanSavings>,
    #[serde(default)]
    pub budget: BudgetStatus,
    #[serde(default)]
    pub sources: Vec<SourceHealth>,
}

impl Snapshot {
    /// Highest context usage across sessions, 0 when none are active.
    #[must_use]
    pub fn max_context_usage(&self) -> f64 {
        self.sessions
            .iter()
            .map(SessionState::context_usage)
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(tokens: i64, limit: i64) -> SessionState {
        SessionState {
            session_id: "s".to_string(),
            agent: "Main".to_string(),
            agent_id: "main".to_string(),
            model: "claude-sonnet-4".to_string(),
            configured_model: String::new(),
            auth_mode: "oauth".to_string(),
            context_tokens: tokens,
            context_limit: limit,
            last_activity: Utc::now(),
            message_count: 1,
            session_cost: 0.1,
            compactions: 0,
        }
    }

    #[test]
    fn context_usage_thresholds() {
        let s = session(150_000, 200_000);
        assert!((s.context_usage() - 0.75).abs() < f64::EPSILON);
        assert!(!s.is_near_compaction());

        let s = session(190_000, 200_000);
        assert!(s.is_near_compaction());
        assert!(s.is_critical());
    }

    #[test]
    fn zero_limit_has_zero_usage() {
        assert!(session(10, 0).context_usage().abs() < f64::EPSILON);
    }

    #[test]
    fn display_model_prefers_configured() {
        let mut s = session(1, 1);
        assert_eq!(s.display_model(), "claude-sonnet-4");
        s.configured_model = "claude-opus-4-6".to_string();
        assert_eq!(s.display_model(), "claude-opus-4-6");
        assert!(s.is_oauth());
    }

    #[test]
    fn quota_window_remaining_and_levels() {
        let now = Utc::now();
        let window = QuotaWindow {
            utilization: 85.0,
            resets_at: Some(now + Duration::minutes(90) + Duration::seconds(5)),
        };
        assert!((window.remaining() - 15.0).abs() < f64::EPSILON);
        assert!(window.is_warning());
        assert!(window.is_critical());
        assert_eq!(window.time_left(now), "1h 30m");

        let over = QuotaWindow {
            utilization: 120.0,
            resets_at: None,
        };
        assert!(over.remaining().abs() < f64::EPSILON);
        assert_eq!(over.time_left(now), "?");
    }

    #[test]
    fn max_context_usage_defaults_to_zero() {
        let mut snapshot = Snapshot::default();
        assert!(snapshot.max_context_usage().abs() < f64::EPSILON);
        snapshot.sessions = vec![session(50, 100), session(90, 100)];
        assert!((snapshot.max_context_usage() - 0.9).abs() < 1e-9);
    }
}
