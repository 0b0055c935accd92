//! Configuration resolution tests
//!
//! Tests that manipulate PAYTRACK_ROOT_FOLDER or PAYTRACK_CONFIG are marked
//! with #[serial] so they never race on process environment.

use paytrack_common::config::{
    CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig, CONFIG_ENV_VAR,
    ROOT_FOLDER_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_compiled_defaults() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.port, 5760);
    assert_eq!(defaults.max_upload_bytes, 10 * 1024 * 1024);
    assert_eq!(defaults.default_region, "IN");
    assert_eq!(defaults.default_currency, "INR");
    assert_eq!(defaults.poll_interval_ms, 2000);
    assert_eq!(defaults.log_level, "info");
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    let root = RootFolderResolver::new("test-module").resolve();
    assert_eq!(root, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_env_var_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV_VAR, "/tmp/paytrack-env-root");

    let toml = TomlConfig {
        root_folder: Some("/tmp/paytrack-toml-root".to_string()),
        ..Default::default()
    };
    let root = RootFolderResolver::new("test-module").with_toml(&toml).resolve();
    assert_eq!(root, PathBuf::from("/tmp/paytrack-env-root"));

    env::remove_var(ROOT_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_resolver_cli_beats_env() {
    env::set_var(ROOT_FOLDER_ENV_VAR, "/tmp/paytrack-env-root");

    let root = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/paytrack-cli-root")))
        .resolve();
    assert_eq!(root, PathBuf::from("/tmp/paytrack-cli-root"));

    env::remove_var(ROOT_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_resolver_toml_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    let toml = TomlConfig {
        root_folder: Some("/tmp/paytrack-toml-root".to_string()),
        ..Default::default()
    };
    let root = RootFolderResolver::new("test-module").with_toml(&toml).resolve();
    assert_eq!(root, PathBuf::from("/tmp/paytrack-toml-root"));
}

#[test]
#[serial]
fn test_missing_config_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    env::set_var(CONFIG_ENV_VAR, dir.path().join("absent.toml"));

    assert_eq!(TomlConfig::load_or_default(), TomlConfig::default());

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_invalid_config_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "port = [not toml").unwrap();
    env::set_var(CONFIG_ENV_VAR, &path);

    assert_eq!(TomlConfig::load_or_default(), TomlConfig::default());

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_config_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("paytrack.toml");
    std::fs::write(&path, "port = 7001\ndefault_currency = \"AED\"\n").unwrap();
    env::set_var(CONFIG_ENV_VAR, &path);

    let config = TomlConfig::load_or_default();
    assert_eq!(config.port, Some(7001));
    assert_eq!(config.default_currency.as_deref(), Some("AED"));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_initializer_creates_layout() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("root");

    let init = RootFolderInitializer::new(root.clone());
    init.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert!(init.uploads_dir().is_dir());
    assert!(init.outputs_dir().is_dir());
    assert_eq!(init.database_path(), root.join("paytrack.db"));
}
