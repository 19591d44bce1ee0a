//! agent-meter - per-agent AI cost and context-window monitor
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use std::process::ExitCode;

use clap::Parser;

use agent_meter::cli::snapshot::View;
use agent_meter::cli::{Cli, Commands, OutputFormat};
use agent_meter::core::logging::{self, LogSettings};
use agent_meter::render::human;
use agent_meter::storage::{Config, ResolvedConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = cli.effective_format();
    let no_color = !agent_meter::util::env::should_use_color(cli.no_color);
    colored::control::set_override(!no_color);

    let file = match Config::load_configured() {
        Ok(file) => file,
        Err(e) => {
            // logging is not up yet; report directly
            report(&e, format, no_color);
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    // must precede resolution, which warns on rejected values
    let cli_level = cli.log_level.as_deref().or(file.general.log_level.as_deref());
    logging::init(&LogSettings::resolve(
        cli_level,
        cli.json_output,
        cli.verbose,
        |key| std::env::var(key).ok(),
    ));
    let config = ResolvedConfig::from_config(&file, &cli.overrides());
    tracing::debug!(
        agents_dir = %config.agents_dir.display(),
        agents_dir_source = %config.sources.agents_dir,
        budget_source = %config.sources.daily_limit,
        remote = config.remote_url.is_some(),
        "configuration resolved"
    );

    let result = match cli.command {
        None | Some(Commands::Snapshot) => {
            agent_meter::cli::snapshot::execute(&config, View::Full, format, cli.pretty, no_color).await
        }
        Some(Commands::Sessions) => {
            agent_meter::cli::snapshot::execute(&config, View::Sessions, format, cli.pretty, no_color)
                .await
        }
        Some(Commands::Watch(_)) => {
            agent_meter::cli::watch::execute(&config, format, cli.pretty, no_color).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, code = e.error_code(), "command failed");
            report(&e, format, no_color);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn report(err: &agent_meter::MeterError, format: OutputFormat, no_color: bool) {
    match format {
        OutputFormat::Human => eprintln!("{}", human::render_error(err, no_color)),
        OutputFormat::Json => eprintln!(
            "{}",
            serde_json::json!({
                "error": err.to_string(),
                "code": err.error_code(),
                "category": err.category().to_string(),
            })
        ),
    }
}
