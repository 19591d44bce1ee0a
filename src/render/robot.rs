//! Robot-mode output (JSON).
//!
//! Every command wraps its payload in a versioned envelope so scripts can
//! detect schema changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::budgets::BudgetAlert;
use crate::core::models::{SessionState, Snapshot};
use crate::error::Result;

pub const SCHEMA_VERSION: &str = "agent-meter.v1";

/// Versioned JSON envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,
    /// One entry per source that failed during the cycle.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl<T> RobotOutput<T> {
    pub fn new(command: impl Into<String>, data: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            command: command.into(),
            data,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }
}

/// Render any serializable value as JSON.
///
/// # Errors
///
/// Serialization failures.
pub fn render_json<T: Serialize>(output: &T, pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(output)?)
    } else {
        Ok(serde_json::to_string(output)?)
    }
}

fn source_errors(snapshot: &Snapshot) -> Vec<String> {
    snapshot
        .sources
        .iter()
        .filter(|s| !s.healthy)
        .map(|s| format!("{}: {}", s.source, s.error.as_deref().unwrap_or("unavailable")))
        .collect()
}

/// # Errors
///
/// Serialization failures.
pub fn render_snapshot_json(snapshot: &Snapshot, pretty: bool) -> Result<String> {
    let output = RobotOutput::new("snapshot", snapshot).with_errors(source_errors(snapshot));
    render_json(&output, pretty)
}

/// # Errors
///
/// Serialization failures.
pub fn render_sessions_json(snapshot: &Snapshot, pretty: bool) -> Result<String> {
    let sessions: &[SessionState] = &snapshot.sessions;
    let output = RobotOutput::new("sessions", sessions).with_errors(source_errors(snapshot));
    render_json(&output, pretty)
}

/// One JSON line per alert, for `watch --json`.
///
/// # Errors
///
/// Serialization failures.
pub fn render_alert_json(alert: &BudgetAlert) -> Result<String> {
    render_json(&RobotOutput::new("budget-alert", alert), false)
}
