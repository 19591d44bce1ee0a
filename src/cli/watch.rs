//! Watch mode: timer-driven refresh until Ctrl+C.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::error::RecvError;

use crate::cli::args::OutputFormat;
use crate::core::models::Snapshot;
use crate::core::refresh::RefreshController;
use crate::error::Result;
use crate::render::{self, human, robot};
use crate::storage::ResolvedConfig;

/// State tracking across watch iterations.
#[derive(Debug, Default)]
pub struct WatchState {
    pub frames: u64,
    pub alerts: u64,
    pub last_published: Option<DateTime<Utc>>,
}

impl WatchState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a published snapshot. Returns `false` for one already shown.
    pub fn update(&mut self, snapshot: &Snapshot) -> bool {
        if self.last_published == Some(snapshot.generated_at) {
            return false;
        }
        self.frames += 1;
        self.last_published = Some(snapshot.generated_at);
        true
    }
}

/// Run watch mode.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be built or output cannot be
/// serialized.
pub async fn execute(
    config: &ResolvedConfig,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<()> {
    let controller = RefreshController::from_config(config)?;
    let mut snapshots = controller.subscribe();
    let mut alerts = controller.alerts();
    let mut state = WatchState::new();

    tracing::info!(
        interval_secs = config.refresh_interval.as_secs(),
        remote = config.remote_url.as_deref().unwrap_or("-"),
        "watch started"
    );

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    let printer = async {
        loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot: Arc<Snapshot> = Arc::clone(&snapshots.borrow_and_update());
                    if state.update(&snapshot) {
                        println!("{}", render::render_snapshot(&snapshot, format, pretty, no_color)?);
                    }
                }
                alert = alerts.recv() => match alert {
                    Ok(alert) => {
                        state.alerts += 1;
                        match format {
                            OutputFormat::Human => eprintln!("{}", human::render_alert(&alert, no_color)),
                            OutputFormat::Json => eprintln!("{}", robot::render_alert_json(&alert)?),
                        }
                    }
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                },
            }
        }
        Ok::<(), crate::error::MeterError>(())
    };

    tokio::select! {
        () = controller.run(config.refresh_interval, shutdown) => {}
        result = printer => result?,
    }

    tracing::info!(frames = state.frames, alerts = state.alerts, "watch stopped");
    Ok(())
}
