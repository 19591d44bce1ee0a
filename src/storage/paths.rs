//! Application paths for config and the default log root.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Application paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
    /// User home, used for the default agents directory.
    pub home: PathBuf,
}

impl AppPaths {
    #[must_use]
    pub fn new() -> Self {
        let home = BaseDirs::new()
            .map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf());
        let config = ProjectDirs::from("", "", "agent-meter").map_or_else(
            || home.join(".config/agent-meter"),
            |dirs| dirs.config_dir().to_path_buf(),
        );
        Self { config, home }
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Default session log root: `~/.clawdbot/agents`.
    #[must_use]
    pub fn default_agents_dir(&self) -> PathBuf {
        self.home.join(".clawdbot").join("agents")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
