//! Test utilities for agent-meter.
//!
//! Provides shared data factories, a scripted collector, an on-disk session
//! log tree and assertion macros for unit and integration tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use agent_meter::test_utils::*;
//!
//! let tree = SessionTree::new();
//! tree.write_session("main", "abc", &[SessionTree::usage_line(&ts, "claude-sonnet-4", 1000, 0.1)]);
//! let record = make_record("Main", 1.25);
//! ```

use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::core::collector::{Collected, Collector};
use crate::core::models::{PRIMARY_PROVIDER, SessionState, UsageRecord};
use crate::error::{MeterError, Result};

// =============================================================================
// Test Data Factories
// =============================================================================

/// A primary-provider record stamped now.
#[must_use]
pub fn make_record(agent: &str, cost: f64) -> UsageRecord {
    make_record_at(agent, PRIMARY_PROVIDER, cost, Utc::now())
}

/// A record with explicit provider and timestamp.
#[must_use]
pub fn make_record_at(agent: &str, provider: &str, cost: f64, timestamp: DateTime<Utc>) -> UsageRecord {
    UsageRecord {
        provider: provider.to_string(),
        agent: agent.to_string(),
        model: "claude-sonnet-4".to_string(),
        input_tokens: 1_000,
        output_tokens: 200,
        cost,
        timestamp,
    }
}

/// An active session with the given context fill.
#[must_use]
pub fn make_session(agent: &str, context_tokens: i64, context_limit: i64) -> SessionState {
    SessionState {
        session_id: format!("{}-session", agent.to_lowercase()),
        agent: agent.to_string(),
        agent_id: agent.to_lowercase(),
        model: "claude-sonnet-4".to_string(),
        configured_model: "claude-sonnet-4".to_string(),
        auth_mode: "oauth".to_string(),
        context_tokens,
        context_limit,
        last_activity: Utc::now(),
        message_count: 12,
        session_cost: 0.42,
        compactions: 0,
    }
}

// =============================================================================
// Scripted Collector
// =============================================================================

/// Collector that returns a fixed result, optionally after a delay.
#[derive(Debug, Clone)]
pub struct FixedCollector {
    name: &'static str,
    /// `None` makes every fetch fail.
    output: Option<Collected>,
    delay: Option<Duration>,
    timeout: Duration,
}

impl FixedCollector {
    #[must_use]
    pub const fn new(name: &'static str, output: Collected) -> Self {
        Self {
            name,
            output: Some(output),
            delay: None,
            timeout: Duration::from_secs(5),
        }
    }

    /// A collector whose every fetch fails with a network error.
    #[must_use]
    pub const fn failing(name: &'static str) -> Self {
        Self {
            name,
            output: None,
            delay: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Collector for FixedCollector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fetch(&self) -> BoxFuture<'_, Result<Collected>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.output
                .clone()
                .ok_or_else(|| MeterError::Network(format!("{} unreachable", self.name)))
        })
    }
}

// =============================================================================
// Session Log Tree
// =============================================================================

/// Temporary `<root>/<agent>/sessions/*.jsonl` tree.
///
/// Removed when dropped.
pub struct SessionTree {
    inner: tempfile::TempDir,
}

impl SessionTree {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    /// The agents root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.inner.path()
    }

    /// Write `<agent>/sessions/<id>.jsonl`, one line per entry.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_session(&self, agent: &str, id: &str, lines: &[String]) -> PathBuf {
        let dir = self.inner.path().join(agent).join("sessions");
        fs::create_dir_all(&dir).expect("Failed to create sessions directory");

        let path = dir.join(format!("{id}.jsonl"));
        let mut file = fs::File::create(&path).expect("Failed to create session log");
        for line in lines {
            writeln!(file, "{line}").expect("Failed to write session log");
        }
        path
    }

    /// Like [`write_session`](Self::write_session), then backdate the file.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written or its mtime cannot be set.
    pub fn write_session_modified(
        &self,
        agent: &str,
        id: &str,
        lines: &[String],
        modified: SystemTime,
    ) -> PathBuf {
        let path = self.write_session(agent, id, lines);
        fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|f| f.set_modified(modified))
            .expect("Failed to set mtime");
        path
    }

    /// A billable assistant line with no cache tokens.
    #[must_use]
    pub fn usage_line(timestamp: &str, model: &str, input: i64, cost: f64) -> String {
        Self::usage_line_with_cache(timestamp, model, input, 0, 0, cost)
    }

    #[must_use]
    pub fn usage_line_with_cache(
        timestamp: &str,
        model: &str,
        input: i64,
        cache_read: i64,
        cache_write: i64,
        cost: f64,
    ) -> String {
        serde_json::json!({
            "type": "message",
            "timestamp": timestamp,
            "message": {
                "role": "assistant",
                "model": model,
                "usage": {
                    "input": input,
                    "output": 120,
                    "cacheRead": cache_read,
                    "cacheWrite": cache_write,
                    "cost": { "total": cost }
                }
            }
        })
        .to_string()
    }

    #[must_use]
    pub fn compaction_line(timestamp: &str) -> String {
        serde_json::json!({ "type": "compaction", "timestamp": timestamp }).to_string()
    }
}

impl Default for SessionTree {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string does NOT contain a substring.
#[macro_export]
macro_rules! assert_not_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            !haystack.contains(needle),
            "Expected string NOT to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert approximate floating point equality.
///
/// ```rust,ignore
/// assert_float_eq!(1.2, 0.6 + 0.6);
/// assert_float_eq!(70.0, 70.05, 0.1); // Custom epsilon
/// ```
#[macro_export]
macro_rules! assert_float_eq {
    ($left:expr, $right:expr) => {
        let left: f64 = $left;
        let right: f64 = $right;
        assert!(
            (left - right).abs() < 1e-9,
            "Float equality assertion failed: {} != {}",
            left,
            right
        );
    };
    ($left:expr, $right:expr, $epsilon:expr) => {
        let left: f64 = $left;
        let right: f64 = $right;
        let epsilon: f64 = $epsilon;
        assert!(
            (left - right).abs() < epsilon,
            "Float equality assertion failed: {} != {} (epsilon: {})",
            left,
            right,
            epsilon
        );
    };
}

// =============================================================================
// Test Helpers
// =============================================================================

/// Strip ANSI escape codes from a string.
#[must_use]
pub fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if chars.peek() == Some(&'[') {
                chars.next();
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}
