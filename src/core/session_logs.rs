//! Session log discovery and parsing.
//!
//! Agent logs live under `<root>/<agent>/sessions/<session-id>.jsonl`, one
//! append-only file per conversation. This module finds those files and
//! rebuilds the latest state of each agent's active session from them.

use crate::core::models::SessionState;
use crate::core::normalize::{LogLine, is_candidate_line};
use crate::core::reverse_lines::ReverseLines;
use crate::error::{MeterError, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Sessions older than this are not considered active.
pub const ACTIVE_WINDOW_HOURS: i64 = 24;

/// At most this many sessions are reported.
pub const MAX_SESSIONS: usize = 8;

const DEFAULT_CONTEXT_LIMIT: i64 = 200_000;

/// Context window sizes by model family. First match wins.
const CONTEXT_LIMITS: &[(&str, i64)] = &[
    ("opus-4-6", 1_000_000),
    ("opus-4.6", 1_000_000),
    ("opus_4_6", 1_000_000),
    ("opus", 200_000),
    ("sonnet", 200_000),
    ("haiku", 200_000),
    ("gpt-4o", 128_000),
    ("gpt-4", 128_000),
    ("o1", 200_000),
    ("o3", 200_000),
    ("gemini", 1_000_000),
];

/// Context window size for a model, defaulting to 200K.
#[must_use]
pub fn context_limit_for_model(model: &str) -> i64 {
    let model = model.to_lowercase();
    CONTEXT_LIMITS
        .iter()
        .find(|(family, _)| model.contains(family))
        .map_or(DEFAULT_CONTEXT_LIMIT, |(_, limit)| *limit)
}

/// Display name for an agent directory: `plaza-marketing` -> `Plaza Marketing`.
#[must_use]
pub fn agent_display_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One agent directory under the log root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDir {
    /// Directory name, used as the agent id.
    pub id: String,
    pub name: String,
    pub sessions_dir: PathBuf,
}

/// Discovered session log file with metadata.
#[derive(Debug, Clone)]
pub struct SessionLogPath {
    pub path: PathBuf,
    pub session_id: String,
    pub modified_at: Option<DateTime<Utc>>,
}

impl SessionLogPath {
    fn new(path: PathBuf) -> Self {
        let session_id = session_id_from_path(&path);
        let modified_at = file_modified_at(&path);
        Self {
            path,
            session_id,
            modified_at,
        }
    }
}

/// Session log discovery under one agents root.
#[derive(Debug, Clone)]
pub struct SessionLogFinder {
    root: PathBuf,
}

impl SessionLogFinder {
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the agents root exists at all.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Agent directories that contain a `sessions` subdirectory, sorted by id.
    #[must_use]
    pub fn agents(&self) -> Vec<AgentDir> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut agents: Vec<AgentDir> = entries
            .flatten()
            .filter_map(|entry| {
                let sessions_dir = entry.path().join("sessions");
                if !sessions_dir.is_dir() {
                    return None;
                }
                let id = entry.file_name().to_str()?.to_string();
                Some(AgentDir {
                    name: agent_display_name(&id),
                    id,
                    sessions_dir,
                })
            })
            .collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    /// Session logs of one agent modified at or after `since`, newest first.
    #[must_use]
    pub fn find_sessions(&self, agent: &AgentDir, since: Option<DateTime<Utc>>) -> Vec<SessionLogPath> {
        let Ok(entries) = fs::read_dir(&agent.sessions_dir) else {
            return Vec::new();
        };

        let mut results: Vec<SessionLogPath> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| is_jsonl_file(path))
            .map(SessionLogPath::new)
            .filter(|log| modified_since(log.modified_at, since))
            .collect();

        sort_logs_by_mtime(&mut results);
        results
    }
}

/// Rebuilds per-agent session state from the logs.
#[derive(Debug, Clone)]
pub struct SessionReader {
    finder: SessionLogFinder,
}

impl SessionReader {
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self {
            finder: SessionLogFinder::new(root),
        }
    }

    /// Latest active session per agent, sorted by context usage.
    ///
    /// A missing root yields an empty list. Unreadable files are skipped.
    #[must_use]
    pub fn read_sessions(&self, now: DateTime<Utc>) -> Vec<SessionState> {
        if !self.finder.exists() {
            tracing::debug!(root = %self.finder.root().display(), "agents root not found");
            return Vec::new();
        }

        let cutoff = now - Duration::hours(ACTIVE_WINDOW_HOURS);
        let mut latest: HashMap<String, SessionState> = HashMap::new();

        for agent in self.finder.agents() {
            for log in self.finder.find_sessions(&agent, Some(cutoff)) {
                let state = match parse_session_log(&log, &agent) {
                    Ok(Some(state)) => state,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::debug!(path = %log.path.display(), error = %e, "skipping session log");
                        continue;
                    }
                };

                match latest.get(&agent.id) {
                    Some(current) if !is_newer(&state, current) => {}
                    _ => {
                        latest.insert(agent.id.clone(), state);
                    }
                }
            }
        }

        let mut sessions: Vec<SessionState> = latest.into_values().collect();
        sort_by_context_usage(&mut sessions);
        sessions.truncate(MAX_SESSIONS);
        sessions
    }
}

fn is_newer(candidate: &SessionState, current: &SessionState) -> bool {
    candidate.last_activity > current.last_activity
        || (candidate.last_activity == current.last_activity
            && candidate.session_id > current.session_id)
}

/// Sort by context usage descending; ties by agent, then session id.
pub fn sort_by_context_usage(sessions: &mut [SessionState]) {
    sessions.sort_by(|a, b| {
        b.context_usage()
            .total_cmp(&a.context_usage())
            .then_with(|| a.agent.cmp(&b.agent))
            .then_with(|| a.session_id.cmp(&b.session_id))
    });
}

/// Parse one session log into its latest state.
///
/// Returns `Ok(None)` when no qualifying line carried context tokens.
pub fn parse_session_log(log: &SessionLogPath, agent: &AgentDir) -> Result<Option<SessionState>> {
    let file = File::open(&log.path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => MeterError::SourceMissing {
            path: log.path.display().to_string(),
        },
        _ => MeterError::Io(e),
    })?;

    let mut session_cost = 0.0;
    let mut message_count = 0;
    let mut compactions = 0;
    let mut latest: Option<(i64, Option<String>, Option<DateTime<Utc>>)> = None;

    let mut lines = ReverseLines::new(file)?;
    for line in lines.by_ref() {
        let line = line?;

        let compaction = line.contains("\"compaction\"");
        if !compaction && !is_candidate_line(&line) {
            continue;
        }
        let Some(entry) = serde_json::from_str::<serde_json::Value>(&line)
            .ok()
            .and_then(|value| LogLine::from_value(&value))
        else {
            continue;
        };

        if entry.is_compaction() {
            compactions += 1;
            continue;
        }
        if !is_candidate_line(&line) {
            continue;
        }

        let usage = entry.usage();
        session_cost += usage.cost;
        message_count += 1;
        // Context comes from the newest line with a nonzero token count.
        if latest.is_none() && usage.context_tokens() > 0 {
            latest = Some((usage.context_tokens(), usage.model, usage.timestamp));
        }
    }

    if lines.skipped_long_lines() > 0 {
        tracing::debug!(
            path = %log.path.display(),
            skipped = lines.skipped_long_lines(),
            "skipped overlong session log lines"
        );
    }

    let Some((context_tokens, model, timestamp)) = latest else {
        return Ok(None);
    };

    let model = model.unwrap_or_else(|| "unknown".to_string());
    let last_activity = timestamp
        .or(log.modified_at)
        .unwrap_or_else(Utc::now);

    Ok(Some(SessionState {
        session_id: log.session_id.clone(),
        agent: agent.name.clone(),
        agent_id: agent.id.clone(),
        context_limit: context_limit_for_model(&model),
        model,
        configured_model: String::new(),
        auth_mode: String::new(),
        context_tokens,
        last_activity,
        message_count,
        session_cost,
        compactions,
    }))
}

#[must_use]
pub fn is_jsonl_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "jsonl")
}

#[must_use]
pub fn session_id_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map_or_else(|| "unknown".to_string(), str::to_string)
}

#[must_use]
pub fn file_modified_at(path: &Path) -> Option<DateTime<Utc>> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}

fn modified_since(modified_at: Option<DateTime<Utc>>, since: Option<DateTime<Utc>>) -> bool {
    match (modified_at, since) {
        (Some(modified), Some(since)) => modified >= since,
        (None, Some(_)) => false,
        (_, None) => true,
    }
}

fn sort_logs_by_mtime(entries: &mut [SessionLogPath]) {
    entries.sort_by(|a, b| {
        b.modified_at
            .cmp(&a.modified_at)
            .then_with(|| a.path.cmp(&b.path))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration as StdDuration, SystemTime};
    use tempfile::TempDir;

    fn usage_line(ts: &str, model: &str, input: i64, cache_read: i64, cost: f64) -> String {
        format!(
            r#"{{"timestamp":"{ts}","message":{{"model":"{model}","usage":{{"input":{input},"output":7,"cacheRead":{cache_read},"cacheWrite":0,"cost":{{"total":{cost}}}}}}}}}"#
        )
    }

    fn write_session(root: &Path, agent: &str, id: &str, lines: &[String]) -> PathBuf {
        let dir = root.join(agent).join("sessions");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{id}.jsonl"));
        fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    fn age(path: &Path, hours: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - StdDuration::from_secs(hours * 3600))
            .unwrap();
    }

    #[test]
    fn context_limits_by_family() {
        assert_eq!(context_limit_for_model("claude-opus-4-6"), 1_000_000);
        assert_eq!(context_limit_for_model("anthropic/claude-opus-4.6"), 1_000_000);
        assert_eq!(context_limit_for_model("claude-opus-4-5"), 200_000);
        assert_eq!(context_limit_for_model("gpt-4o-mini"), 128_000);
        assert_eq!(context_limit_for_model("gemini-2.5-pro"), 1_000_000);
        assert_eq!(context_limit_for_model("mystery"), 200_000);
    }

    #[test]
    fn display_names_are_title_cased() {
        assert_eq!(agent_display_name("plaza-marketing"), "Plaza Marketing");
        assert_eq!(agent_display_name("main"), "Main");
        assert_eq!(agent_display_name("code_REVIEW-bot"), "Code Review Bot");
    }

    #[test]
    fn latest_line_sets_context_and_all_lines_sum_cost() {
        let temp = TempDir::new().unwrap();
        write_session(
            temp.path(),
            "main",
            "abc",
            &[
                usage_line("2026-10-16T08:00:00Z", "claude-sonnet-4", 100, 1000, 0.10),
                r#"{"type":"user","text":"no usage here"}"#.to_string(),
                usage_line("2026-10-16T09:00:00Z", "claude-opus-4-6", 200, 5000, 0.25),
            ],
        );

        let sessions = SessionReader::new(temp.path().to_path_buf()).read_sessions(Utc::now());
        assert_eq!(sessions.len(), 1);
        let session = &sessions[0];
        assert_eq!(session.session_id, "abc");
        assert_eq!(session.agent, "Main");
        assert_eq!(session.agent_id, "main");
        assert_eq!(session.model, "claude-opus-4-6");
        assert_eq!(session.context_tokens, 5200);
        assert_eq!(session.context_limit, 1_000_000);
        assert_eq!(session.message_count, 2);
        assert!((session.session_cost - 0.35).abs() < 1e-9);
        assert_eq!(
            session.last_activity,
            DateTime::parse_from_rfc3339("2026-10-16T09:00:00Z").unwrap()
        );
    }

    #[test]
    fn zero_token_tail_does_not_hide_context() {
        let temp = TempDir::new().unwrap();
        write_session(
            temp.path(),
            "main",
            "abc",
            &[
                usage_line("2026-10-16T08:00:00Z", "claude-sonnet-4", 100, 150_000, 0.5),
                usage_line("2026-10-16T08:05:00Z", "claude-sonnet-4", 0, 0, 0.0),
            ],
        );

        let sessions = SessionReader::new(temp.path().to_path_buf()).read_sessions(Utc::now());
        assert_eq!(sessions.len(), 1);
        let session = &sessions[0];
        assert_eq!(session.context_tokens, 150_100);
        assert_eq!(session.message_count, 2);
        assert!((session.session_cost - 0.5).abs() < 1e-9);
        assert_eq!(
            session.last_activity,
            DateTime::parse_from_rfc3339("2026-10-16T08:00:00Z").unwrap()
        );
    }

    #[test]
    fn compaction_lines_are_counted() {
        let temp = TempDir::new().unwrap();
        write_session(
            temp.path(),
            "main",
            "abc",
            &[
                r#"{"type":"compaction","timestamp":"2026-10-16T07:00:00Z"}"#.to_string(),
                usage_line("2026-10-16T08:00:00Z", "claude-sonnet-4", 100, 0, 0.1),
                r#"{"type":"compaction","timestamp":"2026-10-16T08:30:00Z"}"#.to_string(),
            ],
        );

        let sessions = SessionReader::new(temp.path().to_path_buf()).read_sessions(Utc::now());
        assert_eq!(sessions[0].compactions, 2);
    }

    #[test]
    fn stale_and_empty_sessions_are_ignored() {
        let temp = TempDir::new().unwrap();
        let stale = write_session(
            temp.path(),
            "old",
            "stale",
            &[usage_line("2026-10-10T08:00:00Z", "claude-sonnet-4", 100, 0, 0.1)],
        );
        age(&stale, 25);
        write_session(
            temp.path(),
            "quiet",
            "zero",
            &[usage_line("2026-10-16T08:00:00Z", "claude-sonnet-4", 0, 0, 0.1)],
        );

        let sessions = SessionReader::new(temp.path().to_path_buf()).read_sessions(Utc::now());
        assert!(sessions.is_empty());
    }

    #[test]
    fn one_session_per_agent_most_recent_wins() {
        let temp = TempDir::new().unwrap();
        write_session(
            temp.path(),
            "main",
            "older",
            &[usage_line("2026-10-16T06:00:00Z", "claude-sonnet-4", 190_000, 0, 0.1)],
        );
        write_session(
            temp.path(),
            "main",
            "newer",
            &[usage_line("2026-10-16T09:00:00Z", "claude-sonnet-4", 10_000, 0, 0.1)],
        );

        let sessions = SessionReader::new(temp.path().to_path_buf()).read_sessions(Utc::now());
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, "newer");
    }

    #[test]
    fn sorted_by_usage_and_truncated() {
        let temp = TempDir::new().unwrap();
        for i in 0..10 {
            write_session(
                temp.path(),
                &format!("agent-{i}"),
                "s",
                &[usage_line(
                    "2026-10-16T09:00:00Z",
                    "claude-sonnet-4",
                    (i + 1) * 10_000,
                    0,
                    0.1,
                )],
            );
        }

        let reader = SessionReader::new(temp.path().to_path_buf());
        let sessions = reader.read_sessions(Utc::now());
        assert_eq!(sessions.len(), MAX_SESSIONS);
        assert_eq!(sessions[0].agent, "Agent 9");
        assert!(
            sessions
                .windows(2)
                .all(|w| w[0].context_usage() >= w[1].context_usage())
        );
        assert_eq!(sessions, reader.read_sessions(Utc::now()));
    }

    #[test]
    fn missing_timestamp_falls_back_to_mtime() {
        let temp = TempDir::new().unwrap();
        let path = write_session(
            temp.path(),
            "main",
            "abc",
            &[r#"{"message":{"usage":{"input":50,"cost":{"total":0.01}}}}"#.to_string()],
        );

        let sessions = SessionReader::new(temp.path().to_path_buf()).read_sessions(Utc::now());
        assert_eq!(sessions[0].model, "unknown");
        assert_eq!(Some(sessions[0].last_activity), file_modified_at(&path));
    }

    #[test]
    fn missing_root_yields_nothing() {
        let temp = TempDir::new().unwrap();
        let reader = SessionReader::new(temp.path().join("nope"));
        assert!(reader.read_sessions(Utc::now()).is_empty());
    }

    #[test]
    fn finder_lists_only_agents_with_sessions() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("main").join("sessions")).unwrap();
        fs::create_dir_all(temp.path().join("not-an-agent")).unwrap();

        let finder = SessionLogFinder::new(temp.path().to_path_buf());
        let agents = finder.agents();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].id, "main");
    }
}
