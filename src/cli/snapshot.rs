//! One-shot `snapshot` and `sessions` commands.

use crate::cli::args::OutputFormat;
use crate::core::refresh::{RefreshController, Trigger};
use crate::error::Result;
use crate::render::{self, human, robot};
use crate::storage::ResolvedConfig;

/// What a one-shot command prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Full,
    Sessions,
}

/// Run a single refresh and print it.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be built or output cannot be
/// serialized. Source failures are reported inside the output instead.
pub async fn execute(
    config: &ResolvedConfig,
    view: View,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<()> {
    let controller = RefreshController::from_config(config)?;
    let mut alerts = controller.alerts();

    controller.trigger(Trigger::Manual).await;
    let snapshot = controller.latest();

    let output = match view {
        View::Full => render::render_snapshot(&snapshot, format, pretty, no_color)?,
        View::Sessions => render::render_sessions(&snapshot, format, pretty, no_color)?,
    };
    println!("{output}");

    if let Ok(alert) = alerts.try_recv() {
        match format {
            OutputFormat::Human => eprintln!("{}", human::render_alert(&alert, no_color)),
            OutputFormat::Json => eprintln!("{}", robot::render_alert_json(&alert)?),
        }
    }

    Ok(())
}
