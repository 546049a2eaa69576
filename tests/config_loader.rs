use stagehand::config::{
    Config, ConfigError, SupervisorConfig, ToolchainConfig, PROJECT_CONFIG_FILE,
};
use std::path::PathBuf;
use std::time::Duration;

/// Test that Config::default() produces the documented values.
#[test]
fn test_config_default_values() {
    let config = Config::default();

    assert_eq!(config.supervisor.restart_delay_ms, 1000);
    assert_eq!(config.supervisor.readiness_poll_ms, 100);
    assert_eq!(config.supervisor.shutdown_grace_ms, 2000);
    assert_eq!(config.supervisor.restart_delay(), Duration::from_secs(1));

    assert_eq!(config.toolchain.npx, "npx");
    assert_eq!(config.toolchain.node, "node");
    assert_eq!(config.toolchain.npm, "npm");
    assert_eq!(config.toolchain.git, "git");

    assert!(config.create.template_dir.is_none());
}

/// Test that Config::config_path() returns a path ending with the expected filename.
#[test]
fn test_config_path_ends_with_expected() {
    let path = Config::config_path();
    assert!(path.ends_with("stagehand/config.toml"));
}

/// Test validation passes for the default config.
#[test]
fn test_validation_passes_for_default() {
    assert!(Config::default().validate().is_ok());
}

/// Test validation rejects a zero polling interval.
#[test]
fn test_validation_fails_zero_poll_interval() {
    let config = Config {
        supervisor: SupervisorConfig {
            readiness_poll_ms: 0,
            ..SupervisorConfig::default()
        },
        ..Config::default()
    };

    match config.validate().unwrap_err() {
        ConfigError::ValidationError { message } => {
            assert!(message.contains("readiness_poll_ms"));
        }
        _ => panic!("Expected ValidationError"),
    }
}

/// Test validation rejects a zero restart delay.
#[test]
fn test_validation_fails_zero_restart_delay() {
    let mut config = Config::default();
    config.supervisor.restart_delay_ms = 0;

    match config.validate().unwrap_err() {
        ConfigError::ValidationError { message } => {
            assert!(message.contains("restart_delay_ms"));
        }
        _ => panic!("Expected ValidationError"),
    }
}

/// Test validation rejects an empty program name.
#[test]
fn test_validation_fails_empty_program() {
    let config = Config {
        toolchain: ToolchainConfig {
            node: "  ".to_string(),
            ..ToolchainConfig::default()
        },
        ..Config::default()
    };

    match config.validate().unwrap_err() {
        ConfigError::ValidationError { message } => {
            assert_eq!(message, "toolchain.node must not be empty");
        }
        _ => panic!("Expected ValidationError"),
    }
}

/// Test that a partial file only overrides the keys it names.
#[test]
fn test_partial_config_uses_defaults() {
    let toml_str = r#"
[supervisor]
restart_delay_ms = 250

[toolchain]
npx = "/opt/node/bin/npx"
"#;

    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.supervisor.restart_delay_ms, 250);
    assert_eq!(config.supervisor.readiness_poll_ms, 100);
    assert_eq!(config.toolchain.npx, "/opt/node/bin/npx");
    assert_eq!(config.toolchain.node, "node");
}

/// Test that an empty file parses to the defaults.
#[test]
fn test_empty_config_is_default() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config, Config::default());
}

/// Test that the template directory is read as a path.
#[test]
fn test_create_template_dir() {
    let config: Config =
        toml::from_str("[create]\ntemplate_dir = \"/srv/templates/web\"\n").unwrap();
    assert_eq!(
        config.create.resolved_template_dir(),
        PathBuf::from("/srv/templates/web")
    );
}

/// Test that without a configured template the per-user data dir is used.
#[test]
fn test_default_template_dir_under_data_dir() {
    let dir = Config::default().create.resolved_template_dir();
    assert!(dir.ends_with("stagehand/template"));
}

/// Test loading from a file that exists.
#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[supervisor]\nshutdown_grace_ms = 500\n").unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.supervisor.shutdown_grace(), Duration::from_millis(500));
}

/// Test that a missing file is a read error.
#[test]
fn test_load_from_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    match Config::load_from(&path).unwrap_err() {
        ConfigError::ReadError { path: p, .. } => assert_eq!(p, path),
        _ => panic!("Expected ReadError"),
    }
}

/// Test that malformed TOML is a parse error naming the file.
#[test]
fn test_load_from_invalid_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[supervisor\nrestart_delay_ms = ").unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
    assert!(err.to_string().contains("config.toml"));
}

/// Test that values which parse but fail validation are rejected on load.
#[test]
fn test_load_from_runs_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[supervisor]\nreadiness_poll_ms = 0\n").unwrap();

    assert!(matches!(
        Config::load_from(&path).unwrap_err(),
        ConfigError::ValidationError { .. }
    ));
}

/// Test that a project-local stagehand.toml wins during discovery.
#[test]
fn test_discover_prefers_project_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(PROJECT_CONFIG_FILE),
        "[toolchain]\ngit = \"/usr/local/bin/git\"\n",
    )
    .unwrap();

    let config = Config::discover(dir.path()).unwrap();
    assert_eq!(config.toolchain.git, "/usr/local/bin/git");
}

/// Test that the config serializes to TOML and back.
#[test]
fn test_config_toml_serialization() {
    let mut config = Config::default();
    config.create.template_dir = Some(PathBuf::from("/tmp/template"));

    let serialized = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&serialized).unwrap();
    assert_eq!(parsed, config);
}
