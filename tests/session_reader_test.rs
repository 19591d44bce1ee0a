//! Session log reader over temporary agent trees.

mod common;

use std::time::{Duration as StdDuration, SystemTime};

use agent_meter::core::session_logs::SessionReader;
use agent_meter::test_utils::SessionTree;
use chrono::{Duration, Utc};
use common::fixtures::rfc3339;
use common::logger::TestLogger;

#[test]
fn most_recent_session_per_agent_is_kept() {
    let log = TestLogger::new("most_recent_session_per_agent_is_kept");

    log.phase("setup");
    let tree = SessionTree::new();
    let now = Utc::now();
    let system_now = SystemTime::now();
    tree.write_session_modified(
        "agent-a",
        "session-x",
        &[SessionTree::usage_line(
            &rfc3339(now - Duration::minutes(5)),
            "sonnet",
            150_000,
            0.3,
        )],
        system_now - StdDuration::from_secs(10 * 60),
    );
    tree.write_session_modified(
        "agent-a",
        "session-y",
        &[SessionTree::usage_line(
            &rfc3339(now - Duration::hours(1)),
            "sonnet",
            20_000,
            0.1,
        )],
        system_now - StdDuration::from_secs(2 * 60 * 60),
    );

    log.phase("execute");
    let sessions = SessionReader::new(tree.root().to_path_buf()).read_sessions(now);

    log.phase("verify");
    assert_eq!(sessions.len(), 1);
    let session = &sessions[0];
    assert_eq!(session.session_id, "session-x");
    assert_eq!(session.agent, "Agent A");
    assert_eq!(session.agent_id, "agent-a");
    assert_eq!(session.context_limit, 200_000);
    assert!((session.context_usage() - 0.75).abs() < 1e-9);
    assert!(!session.is_near_compaction());
    log.finish_ok();
}

#[test]
fn files_older_than_a_day_are_not_read() {
    let log = TestLogger::new("files_older_than_a_day_are_not_read");

    let tree = SessionTree::new();
    let now = Utc::now();
    tree.write_session_modified(
        "stale",
        "old",
        &[SessionTree::usage_line(
            &rfc3339(now - Duration::hours(30)),
            "claude-opus-4",
            50_000,
            1.0,
        )],
        SystemTime::now() - StdDuration::from_secs(30 * 60 * 60),
    );

    let sessions = SessionReader::new(tree.root().to_path_buf()).read_sessions(now);
    assert!(sessions.is_empty());
    log.finish_ok();
}

#[test]
fn sessions_without_context_tokens_are_dropped() {
    let tree = SessionTree::new();
    let ts = rfc3339(Utc::now());
    tree.write_session(
        "main",
        "empty",
        &[
            SessionTree::usage_line(&ts, "claude-opus-4", 0, 0.0),
            SessionTree::compaction_line(&ts),
        ],
    );
    tree.write_session(
        "helper",
        "busy",
        &[SessionTree::usage_line(&ts, "claude-haiku-4-5", 12_000, 0.02)],
    );

    let sessions = SessionReader::new(tree.root().to_path_buf()).read_sessions(Utc::now());
    let agents: Vec<_> = sessions.iter().map(|s| s.agent.as_str()).collect();
    assert_eq!(agents, ["Helper"]);
}

#[test]
fn huge_trailing_line_does_not_stall_the_reader() {
    let log = TestLogger::new("huge_trailing_line_does_not_stall_the_reader");

    log.phase("setup");
    let tree = SessionTree::new();
    let ts = rfc3339(Utc::now());
    let filler = format!(r#"{{"type":"tool_result","text":"{}"}}"#, "z".repeat(20 * 1024 * 1024));
    tree.write_session(
        "main",
        "bulky",
        &[SessionTree::usage_line(&ts, "claude-sonnet-4-5", 42_000, 0.4), filler],
    );

    log.phase("execute");
    let started = std::time::Instant::now();
    let sessions = SessionReader::new(tree.root().to_path_buf()).read_sessions(Utc::now());
    log.info(&format!("read in {:?}", started.elapsed()));

    log.phase("verify");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session_id, "bulky");
    assert_eq!(sessions[0].context_tokens, 42_000);
    assert!(started.elapsed() < StdDuration::from_secs(30));
    log.finish_ok();
}
