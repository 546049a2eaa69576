mod loader;
mod types;

pub use loader::{ConfigError, PROJECT_CONFIG_FILE};
pub use types::{Config, CreateConfig, SupervisorConfig, ToolchainConfig};
