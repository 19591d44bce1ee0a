//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::storage::ConfigOverrides;

/// Agent Meter - per-agent AI cost and context-window monitor.
#[derive(Parser, Debug)]
#[command(name = "agent-meter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    // === Source overrides ===
    /// Remote metering server base URL
    #[arg(long, value_name = "URL", global = true)]
    pub remote: Option<String>,

    /// Agent log root (default ~/.clawdbot/agents)
    #[arg(long, value_name = "DIR", global = true)]
    pub agents_dir: Option<PathBuf>,

    /// Daily budget limit in USD
    #[arg(long, value_name = "USD", global = true)]
    pub budget: Option<String>,
}

impl Cli {
    /// Resolve the effective output format.
    #[must_use]
    pub fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }

    /// Config values given on the command line.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            remote_url: self.remote.clone(),
            agents_dir: self.agents_dir.clone(),
            budget: self.budget.clone(),
            refresh_interval_seconds: match &self.command {
                Some(Commands::Watch(args)) => args.interval,
                _ => None,
            },
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one refresh and print costs, sessions and quota (default)
    Snapshot,

    /// Run one refresh and print active sessions only
    Sessions,

    /// Refresh on a timer until Ctrl+C
    Watch(WatchArgs),
}

/// Arguments for the `watch` command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Seconds between refreshes (default from config, else 300)
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<u64>,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}
