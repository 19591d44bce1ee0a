//! Configuration file and platform paths.

pub mod config;
pub mod paths;

pub use config::{
    Config, ConfigOverrides, ConfigSource, ConfigSources, ENV_AGENTS_DIR, ENV_BUDGET, ENV_CONFIG,
    ENV_OPENAI_KEY, ENV_OPENROUTER_KEY, ENV_REMOTE_URL, ResolvedConfig,
};
pub use paths::AppPaths;
