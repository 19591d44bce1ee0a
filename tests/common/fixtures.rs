//! Fixture loaders and response-body factories for integration tests.
//!
//! Static bodies live under `tests/fixtures/`. Bodies whose timestamps must
//! land inside the current cost windows are built on the fly instead.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Load and deserialize a fixture relative to `tests/fixtures/`.
///
/// # Panics
///
/// Panics if the file cannot be read or parsed.
pub fn load_fixture<T: DeserializeOwned>(path: &str) -> T {
    let full_path = fixtures_dir().join(path);
    let content = fs::read_to_string(&full_path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", full_path.display()));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", full_path.display()))
}

pub fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One `/api/usage` record.
pub fn remote_record(agent: &str, provider: &str, cost: f64, ts: DateTime<Utc>) -> Value {
    json!({
        "provider": provider,
        "agent": agent,
        "model": "claude-opus-4-6",
        "inputTokens": 1000,
        "outputTokens": 100,
        "cost": cost,
        "timestamp": rfc3339(ts),
    })
}

/// A `/api/usage` body holding `records`.
pub fn remote_usage_body(records: Vec<Value>, has_log_source: bool) -> Value {
    json!({ "records": records, "hasClawdbot": has_log_source })
}

/// One `/api/sessions` entry.
pub fn remote_session(id: &str, agent: &str, tokens: i64, limit: i64) -> Value {
    json!({
        "id": id,
        "agent": agent,
        "model": "claude-opus-4-6",
        "contextTokens": tokens,
        "contextLimit": limit,
        "lastActivity": rfc3339(Utc::now()),
        "messageCount": 4,
        "sessionCost": 0.5,
    })
}

pub fn remote_sessions_body(sessions: Vec<Value>) -> Value {
    json!({ "sessions": sessions })
}
