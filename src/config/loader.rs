use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;

/// File name of the project-local configuration.
pub const PROJECT_CONFIG_FILE: &str = "stagehand.toml";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the per-user configuration file.
    ///
    /// Uses `~/.config/stagehand/config.toml` on Linux, or the platform
    /// equivalent via `dirs::config_dir()`. Falls back to the current
    /// directory if no config dir is available.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("stagehand").join("config.toml")
    }

    /// Loads the configuration that applies to `project_root`.
    ///
    /// A `stagehand.toml` in the project wins over the per-user file; if
    /// neither exists, defaults are used.
    pub fn discover(project_root: &Path) -> Result<Self, ConfigError> {
        let local = project_root.join(PROJECT_CONFIG_FILE);
        if local.exists() {
            return Self::load_from(&local);
        }
        let user = Self::config_path();
        if user.exists() {
            return Self::load_from(&user);
        }
        Ok(Config::default())
    }

    /// Loads, parses and validates a configuration file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - Polling interval and restart delay are non-zero
    /// - Toolchain program names are non-empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.supervisor.readiness_poll_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "supervisor.readiness_poll_ms must be greater than 0".to_string(),
            });
        }
        if self.supervisor.restart_delay_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "supervisor.restart_delay_ms must be greater than 0".to_string(),
            });
        }

        let programs = [
            ("npx", &self.toolchain.npx),
            ("node", &self.toolchain.node),
            ("npm", &self.toolchain.npm),
            ("git", &self.toolchain.git),
        ];
        if let Some((key, _)) = programs.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::ValidationError {
                message: format!("toolchain.{} must not be empty", key),
            });
        }

        Ok(())
    }
}
