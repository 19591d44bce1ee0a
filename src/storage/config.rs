//! Configuration file loading and resolution.
//!
//! Loads `config.toml` from the platform config dir (for example
//! `~/.config/agent-meter/config.toml` on Linux), or from `AGENT_METER_CONFIG`.
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! A malformed file is an error. A well-formed file (or env var, or flag)
//! carrying an invalid value is not: the value is ignored with a warning and
//! resolution falls through to the next layer.
//!
//! ## Environment Variables
//!
//! - `AGENT_METER_CONFIG`: Override config file path
//! - `AGENT_METER_REMOTE_URL`: Remote metering server base URL
//! - `AGENT_METER_AGENTS_DIR`: Session log root
//! - `AGENT_METER_BUDGET`: Daily budget limit in USD
//! - `OPENAI_API_KEY`, `OPENROUTER_API_KEY`: Vendor API keys

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::core::budgets::DEFAULT_DAILY_LIMIT;
use crate::core::plan::Plan;
use crate::error::{MeterError, Result};
use crate::providers::{openai, openrouter};

// =============================================================================
// Environment Variable Names
// =============================================================================

pub const ENV_CONFIG: &str = "AGENT_METER_CONFIG";
pub const ENV_REMOTE_URL: &str = "AGENT_METER_REMOTE_URL";
pub const ENV_AGENTS_DIR: &str = "AGENT_METER_AGENTS_DIR";
pub const ENV_BUDGET: &str = "AGENT_METER_BUDGET";
pub const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENROUTER_KEY: &str = "OPENROUTER_API_KEY";

/// Default timer interval.
pub const DEFAULT_REFRESH_SECONDS: u64 = 300;

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub remote_url: Option<String>,
    pub agents_dir: Option<PathBuf>,
    /// Raw text so a non-numeric value can be ignored like any other layer.
    pub budget: Option<String>,
    pub refresh_interval_seconds: Option<u64>,
}

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub refresh_interval: Duration,
    pub agents_dir: PathBuf,
    /// Remote server; when set and healthy it is the only source.
    pub remote_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub openai_base_url: String,
    pub openrouter_base_url: String,
    pub daily_limit: f64,
    pub plan: Plan,
    pub log_level: Option<String>,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub refresh_interval: ConfigSource,
    pub agents_dir: ConfigSource,
    pub remote_url: ConfigSource,
    pub daily_limit: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve an already loaded config file against CLI overrides and the
    /// process environment.
    #[must_use]
    pub fn from_config(config: &Config, overrides: &ConfigOverrides) -> Self {
        Self::resolve_with(config, overrides, &AppPaths::new(), |key| std::env::var(key).ok())
    }

    /// Resolve against an explicit config and environment lookup.
    #[must_use]
    pub fn resolve_with(
        config: &Config,
        overrides: &ConfigOverrides,
        paths: &AppPaths,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut sources = ConfigSources::default();

        let refresh_interval =
            Self::resolve_interval(overrides, config, &mut sources.refresh_interval);

        // agents dir
        let agents_dir = if let Some(dir) = &overrides.agents_dir {
            sources.agents_dir = ConfigSource::Cli;
            dir.clone()
        } else if let Some(dir) = env(ENV_AGENTS_DIR) {
            sources.agents_dir = ConfigSource::Env;
            PathBuf::from(dir)
        } else if let Some(dir) = &config.sources.agents_dir {
            sources.agents_dir = ConfigSource::ConfigFile;
            dir.clone()
        } else {
            paths.default_agents_dir()
        };

        // remote url
        let remote_url = if let Some(url) = overrides.remote_url.clone().filter(|u| !u.is_empty()) {
            sources.remote_url = ConfigSource::Cli;
            Some(url)
        } else if let Some(url) = env(ENV_REMOTE_URL) {
            sources.remote_url = ConfigSource::Env;
            Some(url)
        } else if let Some(url) = config.sources.remote_url.clone().filter(|u| !u.is_empty()) {
            sources.remote_url = ConfigSource::ConfigFile;
            Some(url)
        } else {
            None
        };

        let daily_limit = Self::resolve_budget(
            overrides.budget.as_deref(),
            env(ENV_BUDGET).as_deref(),
            config.budget.daily_limit,
            &mut sources.daily_limit,
        );

        let plan = Plan::from_config(&config.plan.kind, config.plan.custom_cost).unwrap_or_else(|| {
            tracing::warn!(kind = %config.plan.kind, "unknown plan kind, ignoring");
            Plan::None
        });

        Self {
            refresh_interval,
            agents_dir,
            remote_url,
            openai_api_key: env(ENV_OPENAI_KEY)
                .or_else(|| config.vendors.openai_api_key.clone().filter(|k| !k.is_empty())),
            openrouter_api_key: env(ENV_OPENROUTER_KEY)
                .or_else(|| config.vendors.openrouter_api_key.clone().filter(|k| !k.is_empty())),
            openai_base_url: config
                .vendors
                .openai_base_url
                .clone()
                .unwrap_or_else(|| openai::API_BASE.to_string()),
            openrouter_base_url: config
                .vendors
                .openrouter_base_url
                .clone()
                .unwrap_or_else(|| openrouter::API_BASE.to_string()),
            daily_limit,
            plan,
            log_level: config.general.log_level.clone(),
            sources,
        }
    }

    fn resolve_interval(
        overrides: &ConfigOverrides,
        config: &Config,
        source: &mut ConfigSource,
    ) -> Duration {
        // 1. CLI flag
        if let Some(secs) = overrides.refresh_interval_seconds {
            if secs > 0 {
                *source = ConfigSource::Cli;
                return Duration::from_secs(secs);
            }
            tracing::warn!("ignoring zero refresh interval from CLI");
        }

        // 2. Config file
        if let Some(secs) = config.general.refresh_interval_seconds {
            if secs > 0 {
                *source = ConfigSource::ConfigFile;
                return Duration::from_secs(secs);
            }
            tracing::warn!("ignoring zero refresh_interval_seconds in config file");
        }

        // 3. Default
        *source = ConfigSource::Default;
        Duration::from_secs(DEFAULT_REFRESH_SECONDS)
    }

    fn resolve_budget(
        cli: Option<&str>,
        env: Option<&str>,
        file: Option<f64>,
        source: &mut ConfigSource,
    ) -> f64 {
        if let Some(limit) = cli.and_then(|raw| parse_limit(raw, "--budget")) {
            *source = ConfigSource::Cli;
            return limit;
        }
        if let Some(limit) = env.and_then(|raw| parse_limit(raw, ENV_BUDGET)) {
            *source = ConfigSource::Env;
            return limit;
        }
        if let Some(limit) = file {
            if limit.is_finite() && limit >= 0.0 {
                *source = ConfigSource::ConfigFile;
                return limit;
            }
            tracing::warn!(limit, "ignoring invalid budget.daily_limit in config file");
        }
        *source = ConfigSource::Default;
        DEFAULT_DAILY_LIMIT
    }
}

fn parse_limit(raw: &str, origin: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(limit) if limit.is_finite() && limit >= 0.0 => Some(limit),
        _ => {
            tracing::warn!(origin, value = raw, "ignoring invalid budget limit");
            None
        }
    }
}

// =============================================================================
// Config File
// =============================================================================

/// Application configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub sources: SourcesConfig,
    pub vendors: VendorsConfig,
    pub budget: BudgetConfig,
    pub plan: PlanConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Timer interval for `watch`.
    pub refresh_interval_seconds: Option<u64>,
    /// Default log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub agents_dir: Option<PathBuf>,
    pub remote_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorsConfig {
    pub openai_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openrouter_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub daily_limit: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// none, anthropic-max, anthropic-pro, chatgpt-plus, chatgpt-pro, custom
    pub kind: String,
    pub custom_cost: Option<f64>,
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().config_file())
    }

    /// Load from `AGENT_METER_CONFIG` when set, else from the default path.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but is invalid.
    pub fn load_configured() -> Result<Self> {
        match std::env::var(ENV_CONFIG) {
            Ok(path) if !path.trim().is_empty() => Self::load_from(Path::new(path.trim())),
            _ => Self::load(),
        }
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| MeterError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}
