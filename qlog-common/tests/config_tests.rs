//! Config file resolution and loading
//!
//! Tests that touch process environment variables are marked #[serial] so
//! they do not race each other.

use qlog_common::config::{load_toml_or_default, resolve_config_path, LoggingConfig, APP_DIR};
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TEST_ENV_VAR: &str = "QLOG_TEST_CONFIG";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ToolConfig {
    station_callsign: Option<String>,
    logging: LoggingConfig,
    retries: u32,
}

#[test]
#[serial]
fn test_env_var_used_when_no_cli_argument() {
    env::set_var(TEST_ENV_VAR, "/etc/qlog/from-env.toml");
    let path = resolve_config_path(None, TEST_ENV_VAR, "tool.toml");
    env::remove_var(TEST_ENV_VAR);

    assert_eq!(path, Some(PathBuf::from("/etc/qlog/from-env.toml")));
}

#[test]
#[serial]
fn test_cli_argument_beats_env_var() {
    env::set_var(TEST_ENV_VAR, "/etc/qlog/from-env.toml");
    let path = resolve_config_path(Some(Path::new("/tmp/cli.toml")), TEST_ENV_VAR, "tool.toml");
    env::remove_var(TEST_ENV_VAR);

    assert_eq!(path, Some(PathBuf::from("/tmp/cli.toml")));
}

#[test]
#[serial]
fn test_blank_env_var_falls_through_to_config_dir() {
    env::set_var(TEST_ENV_VAR, "   ");
    let path = resolve_config_path(None, TEST_ENV_VAR, "tool.toml");
    env::remove_var(TEST_ENV_VAR);

    if let Some(path) = path {
        assert!(path.ends_with(Path::new(APP_DIR).join("tool.toml")));
    }
}

#[test]
fn test_load_parses_partial_file_with_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tool.toml");
    std::fs::write(&path, "station_callsign = \"OK1XYZ\"\n\n[logging]\nlevel = \"qlog_qsl=debug\"\n").unwrap();

    let config: ToolConfig = load_toml_or_default(Some(&path)).unwrap();

    assert_eq!(config.station_callsign.as_deref(), Some("OK1XYZ"));
    assert_eq!(config.logging.level, "qlog_qsl=debug");
    assert!(config.logging.file.is_none());
    assert_eq!(config.retries, 0);
}

#[test]
fn test_load_without_location_gives_defaults() {
    let config: ToolConfig = load_toml_or_default(None).unwrap();
    assert!(config.station_callsign.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_unparseable_file_is_a_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tool.toml");
    std::fs::write(&path, "retries = \"many\"\n").unwrap();

    let err = load_toml_or_default::<ToolConfig>(Some(&path)).unwrap_err();
    assert!(matches!(err, qlog_common::Error::Config(_)));
    assert!(err.to_string().contains("tool.toml"));
}
