//! Configuration loading and resolution tests
//!
//! Covers:
//! - Missing TOML files do not abort (warning + defaults)
//! - Priority order CLI → ENV → TOML for the config path and API key
//! - Atomic TOML write + reload
//!
//! Note: Uses serial_test to prevent ENV variable race conditions.
//! Tests that touch CINEGRAPH_CONFIG or CINEGRAPH_API_KEY are marked #[serial].

use cinegraph_common::config::{
    load_or_default, load_toml_config, resolve_api_key, resolve_config_path, write_toml_config,
    TomlConfig, API_KEY_ENV_VAR, CONFIG_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    let config = load_or_default(Some(&missing)).expect("missing file must not be an error");
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_malformed_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.toml");
    std::fs::write(&path, "[graph\nreverse_discount = ").unwrap();

    assert!(load_or_default(Some(&path)).is_err());
}

#[test]
fn test_write_then_load_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.toml");

    let mut config = TomlConfig::default();
    config.build.limits.movies = 25;
    config.build.search_terms.companies = vec!["A24".to_string()];
    config.graph.max_connections_per_type = 8;
    config.source.api_key = Some("secret".to_string());

    write_toml_config(&config, &path).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("toml.tmp").exists(), "temp file must be renamed away");

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
#[serial]
fn test_config_path_priority() {
    env::remove_var(CONFIG_ENV_VAR);

    // CLI wins over everything
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let cli = PathBuf::from("/from/cli.toml");
    assert_eq!(resolve_config_path(Some(&cli)), Some(cli.clone()));

    // ENV wins over the platform default
    assert_eq!(resolve_config_path(None), Some(PathBuf::from("/from/env.toml")));

    // Blank ENV is ignored
    env::set_var(CONFIG_ENV_VAR, "  ");
    let resolved = resolve_config_path(None);
    assert_ne!(resolved, Some(PathBuf::from("  ")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_api_key_priority() {
    env::remove_var(API_KEY_ENV_VAR);

    let mut config = TomlConfig::default();
    config.source.api_key = Some("toml-key".to_string());

    assert_eq!(resolve_api_key(None, &config), Some("toml-key".to_string()));

    env::set_var(API_KEY_ENV_VAR, "env-key");
    assert_eq!(resolve_api_key(None, &config), Some("env-key".to_string()));
    assert_eq!(resolve_api_key(Some("cli-key"), &config), Some("cli-key".to_string()));

    // Whitespace-only CLI key falls through to ENV
    assert_eq!(resolve_api_key(Some("   "), &config), Some("env-key".to_string()));

    env::remove_var(API_KEY_ENV_VAR);
    config.source.api_key = None;
    assert_eq!(resolve_api_key(None, &config), None);
}
