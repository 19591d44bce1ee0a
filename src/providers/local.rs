//! Local agent log collector.
//!
//! Reads every `<root>/<agent>/sessions/*.jsonl` touched since the start of
//! the widest cost window and turns billable lines into usage records.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use futures::future::BoxFuture;

use crate::core::collector::{Collected, Collector};
use crate::core::models::UsageRecord;
use crate::core::normalize::parse_log_line;
use crate::core::session_logs::{AgentDir, SessionLogFinder};
use crate::error::{MeterError, Result};
use crate::util::time::CalendarWindows;

/// Source name for local logs.
pub const SOURCE_LOCAL: &str = "local-logs";

/// Generous bound: a month of logs can be large.
const LOCAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Collector over the local agent log tree.
#[derive(Debug, Clone)]
pub struct LocalLogCollector {
    finder: SessionLogFinder,
}

impl LocalLogCollector {
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self {
            finder: SessionLogFinder::new(root),
        }
    }

    /// Whether the agents root exists.
    #[must_use]
    pub fn has_log_source(&self) -> bool {
        self.finder.exists()
    }

    /// Scan all agent logs for records at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns [`MeterError::SourceMissing`] when the root does not exist.
    pub fn scan(&self, since: DateTime<Utc>) -> Result<Vec<UsageRecord>> {
        if !self.finder.exists() {
            return Err(MeterError::SourceMissing {
                path: self.finder.root().display().to_string(),
            });
        }

        let mut records = Vec::new();
        for agent in self.finder.agents() {
            for log in self.finder.find_sessions(&agent, Some(since)) {
                match scan_file(&log.path, &agent, since) {
                    Ok(found) => records.extend(found),
                    Err(e) => {
                        tracing::debug!(path = %log.path.display(), error = %e, "skipping log file");
                    }
                }
            }
        }

        tracing::debug!(records = records.len(), since = %since, "local log scan complete");
        Ok(records)
    }
}

fn scan_file(path: &std::path::Path, agent: &AgentDir, since: DateTime<Utc>) -> Result<Vec<UsageRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    let mut malformed = 0usize;

    for line in reader.lines() {
        let Ok(line) = line else {
            continue;
        };
        match parse_log_line(&line, &agent.name) {
            Ok(Some(record)) if record.timestamp >= since => records.push(record),
            Ok(_) => {}
            Err(_) => malformed += 1,
        }
    }

    if malformed > 0 {
        tracing::debug!(path = %path.display(), malformed, "skipped malformed log lines");
    }
    Ok(records)
}

impl Collector for LocalLogCollector {
    fn name(&self) -> &'static str {
        SOURCE_LOCAL
    }

    fn timeout(&self) -> Duration {
        LOCAL_TIMEOUT
    }

    fn fetch(&self) -> BoxFuture<'_, Result<Collected>> {
        let collector = self.clone();
        Box::pin(async move {
            let since = CalendarWindows::around(&Local::now()).earliest_start();
            let records = tokio::task::spawn_blocking(move || collector.scan(since))
                .await
                .map_err(|e| MeterError::Other(anyhow::anyhow!("log scan task failed: {e}")))??;
            Ok(Collected::records(records))
        })
    }
}
