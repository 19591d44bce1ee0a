//! Daily budget limit and its one-shot alert.
//!
//! The alert fires the first time today's spend reaches the limit and then
//! stays quiet, even if spend drops and crosses again, until the user sets a
//! new limit.

use serde::{Deserialize, Serialize};

/// Default daily limit in USD.
pub const DEFAULT_DAILY_LIMIT: f64 = 10.0;

/// Raised when today's spend reaches the daily limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAlert {
    /// The configured limit.
    pub limit: f64,
    /// Today's spend at the time of the alert.
    pub current: f64,
    /// Percentage of limit used (current/limit * 100).
    pub percent_used: f64,
}

impl BudgetAlert {
    #[must_use]
    pub fn new(limit: f64, current: f64) -> Self {
        let percent_used = if limit > 0.0 {
            (current / limit) * 100.0
        } else {
            100.0
        };
        Self {
            limit,
            current,
            percent_used,
        }
    }
}

/// Outcome of setting a new limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitChange {
    Applied,
    /// Value was not a finite non-negative number; the prior limit stays.
    Rejected,
}

/// Tracks the daily limit and whether its alert already fired.
#[derive(Debug, Clone)]
pub struct BudgetMonitor {
    limit: f64,
    alert_raised: bool,
}

impl Default for BudgetMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_LIMIT)
    }
}

impl BudgetMonitor {
    /// Create a monitor. An invalid limit falls back to the default.
    #[must_use]
    pub fn new(limit: f64) -> Self {
        Self {
            limit: if is_valid_limit(limit) {
                limit
            } else {
                DEFAULT_DAILY_LIMIT
            },
            alert_raised: false,
        }
    }

    #[must_use]
    pub const fn limit(&self) -> f64 {
        self.limit
    }

    #[must_use]
    pub const fn alert_raised(&self) -> bool {
        self.alert_raised
    }

    /// Replace the limit and re-arm the alert.
    pub fn set_limit(&mut self, limit: f64) -> LimitChange {
        if !is_valid_limit(limit) {
            tracing::warn!(limit, kept = self.limit, "ignoring invalid budget limit");
            return LimitChange::Rejected;
        }
        self.limit = limit;
        self.alert_raised = false;
        LimitChange::Applied
    }

    /// Parse and apply a user-supplied limit.
    pub fn set_limit_str(&mut self, raw: &str) -> LimitChange {
        match raw.trim().parse::<f64>() {
            Ok(limit) => self.set_limit(limit),
            Err(_) => {
                tracing::warn!(value = raw, kept = self.limit, "ignoring non-numeric budget limit");
                LimitChange::Rejected
            }
        }
    }

    /// Check today's spend. Returns an alert at most once per armed limit.
    pub fn evaluate(&mut self, today_cost: f64) -> Option<BudgetAlert> {
        if self.alert_raised || today_cost < self.limit {
            return None;
        }
        self.alert_raised = true;
        Some(BudgetAlert::new(self.limit, today_cost))
    }

    /// Fraction of the limit used, for display.
    #[must_use]
    pub fn percent_used(&self, today_cost: f64) -> f64 {
        BudgetAlert::new(self.limit, today_cost).percent_used
    }
}

fn is_valid_limit(limit: f64) -> bool {
    limit.is_finite() && limit >= 0.0
}
