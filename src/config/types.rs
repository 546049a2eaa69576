use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    #[serde(default)]
    pub create: CreateConfig,
}

/// Timing knobs for the process supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Delay before the dev server is respawned after it exits (default: 1000).
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    /// Readiness gate polling interval (default: 100).
    #[serde(default = "default_readiness_poll_ms")]
    pub readiness_poll_ms: u64,
    /// Time a process gets between SIGTERM and SIGKILL on shutdown (default: 2000).
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

/// Executables used to drive the project toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    #[serde(default = "default_npx")]
    pub npx: String,
    #[serde(default = "default_node")]
    pub node: String,
    #[serde(default = "default_npm")]
    pub npm: String,
    #[serde(default = "default_git")]
    pub git: String,
}

/// Settings for `stagehand create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CreateConfig {
    /// Template tree to copy. Falls back to the per-user data directory.
    #[serde(default)]
    pub template_dir: Option<PathBuf>,
}

fn default_restart_delay_ms() -> u64 {
    1000
}

fn default_readiness_poll_ms() -> u64 {
    100
}

fn default_shutdown_grace_ms() -> u64 {
    2000
}

fn default_npx() -> String {
    "npx".to_string()
}

fn default_node() -> String {
    "node".to_string()
}

fn default_npm() -> String {
    "npm".to_string()
}

fn default_git() -> String {
    "git".to_string()
}

impl SupervisorConfig {
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_delay_ms: default_restart_delay_ms(),
            readiness_poll_ms: default_readiness_poll_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            npx: default_npx(),
            node: default_node(),
            npm: default_npm(),
            git: default_git(),
        }
    }
}

impl CreateConfig {
    /// Configured template directory, or `<data dir>/stagehand/template`.
    pub fn resolved_template_dir(&self) -> PathBuf {
        if let Some(dir) = &self.template_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stagehand")
            .join("template")
    }
}
