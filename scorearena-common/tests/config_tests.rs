//! Unit tests for configuration resolution and graceful degradation
//!
//! Tests cover:
//! - Missing TOML file SHALL NOT cause termination
//! - Priority order: overrides > TOML > compiled defaults
//! - Automatic directory creation

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use scorearena_common::config::{
    default_root_folder, ConfigOverrides, ServiceConfig, TomlConfig, DEFAULT_CONVERTER_BIN,
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT,
};
use tempfile::TempDir;

#[test]
fn test_defaults_without_overrides_or_toml() {
    let config = ServiceConfig::resolve(ConfigOverrides::default(), TomlConfig::default());

    assert_eq!(config.root_folder, default_root_folder());
    assert_eq!(
        config.bind_addr,
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT)
    );
    assert_eq!(config.converter_bin, DEFAULT_CONVERTER_BIN);
    assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    assert_eq!(config.log_level, "info");
}

#[test]
fn test_default_root_folder_is_not_empty() {
    let root = default_root_folder();
    assert!(!root.as_os_str().is_empty());
    assert!(root.to_string_lossy().contains("scorearena"));
}

#[test]
fn test_toml_values_override_defaults() {
    let toml = TomlConfig::from_toml_str(
        r#"
        root_folder = "/srv/scorearena"
        host = "127.0.0.1"
        port = 8080
        converter_bin = "/opt/mscore/bin/mscore4"
        max_upload_bytes = 1048576

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = ServiceConfig::resolve(ConfigOverrides::default(), toml);

    assert_eq!(config.root_folder, PathBuf::from("/srv/scorearena"));
    assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
    assert_eq!(config.converter_bin, "/opt/mscore/bin/mscore4");
    assert_eq!(config.max_upload_bytes, 1_048_576);
    assert_eq!(config.log_level, "debug");
}

#[test]
fn test_overrides_take_precedence_over_toml() {
    let toml = TomlConfig::from_toml_str(
        r#"
        root_folder = "/srv/from-toml"
        port = 8080
        converter_bin = "toml-musescore"
        "#,
    )
    .unwrap();

    let overrides = ConfigOverrides {
        root_folder: Some(PathBuf::from("/tmp/from-cli")),
        port: Some(9000),
        converter_bin: Some("cli-musescore".to_string()),
        log_level: Some("warn".to_string()),
        ..Default::default()
    };

    let config = ServiceConfig::resolve(overrides, toml);

    assert_eq!(config.root_folder, PathBuf::from("/tmp/from-cli"));
    assert_eq!(config.bind_addr.port(), 9000);
    assert_eq!(config.converter_bin, "cli-musescore");
    assert_eq!(config.log_level, "warn");
}

#[test]
fn test_missing_config_file_does_not_error() {
    let dir = TempDir::new().unwrap();
    let config = TomlConfig::load(&dir.path().join("nope.toml"));

    assert!(config.is_ok(), "Missing config must fall back to defaults");
    assert!(config.unwrap().root_folder.is_none());
}

#[test]
fn test_malformed_config_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    assert!(TomlConfig::load(&path).is_err());
}

#[test]
fn test_unknown_config_key_is_error() {
    assert!(TomlConfig::from_toml_str("upload_password = \"hunter2\"").is_err());
}

#[test]
fn test_log_paths_live_under_root_folder() {
    let overrides = ConfigOverrides {
        root_folder: Some(PathBuf::from("/data/arena")),
        ..Default::default()
    };
    let config = ServiceConfig::resolve(overrides, TomlConfig::default());

    assert_eq!(config.uploads_dir(), PathBuf::from("/data/arena/uploads"));
    assert_eq!(config.verdicts_csv(), PathBuf::from("/data/arena/arena_verdicts.csv"));
    assert_eq!(config.ratings_csv(), PathBuf::from("/data/arena/ratings.csv"));
    assert_eq!(config.metadata_csv(), PathBuf::from("/data/arena/metadata.csv"));
}

#[test]
fn test_ensure_directories_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let overrides = ConfigOverrides {
        root_folder: Some(dir.path().join("nested").join("root")),
        ..Default::default()
    };
    let config = ServiceConfig::resolve(overrides, TomlConfig::default());

    config.ensure_directories().unwrap();
    config.ensure_directories().unwrap();

    assert!(config.uploads_dir().is_dir());
}
