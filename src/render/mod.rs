//! Output rendering for human and robot modes.

pub mod human;
pub mod robot;

use chrono::Utc;

use crate::cli::args::OutputFormat;
use crate::core::models::Snapshot;
use crate::error::Result;

/// Render the full snapshot.
///
/// # Errors
///
/// JSON serialization failures.
pub fn render_snapshot(
    snapshot: &Snapshot,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_snapshot(snapshot, Utc::now(), no_color)),
        OutputFormat::Json => robot::render_snapshot_json(snapshot, pretty),
    }
}

/// Render only the session list.
///
/// # Errors
///
/// JSON serialization failures.
pub fn render_sessions(
    snapshot: &Snapshot,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_sessions(&snapshot.sessions, Utc::now(), no_color)),
        OutputFormat::Json => robot::render_sessions_json(snapshot, pretty),
    }
}
