use super::data::{path_display, Config, DEFAULT_SERVER_URL, MODEL_ENV, SERVER_URL_ENV};
use super::io::ConfigError;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
    assert_eq!(config.server_url(), DEFAULT_SERVER_URL);
    assert_eq!(config.reconnect_delay(), Duration::from_secs(2));
    assert_eq!(config.download_prefix(), "/api/download/");
    assert!(config.syntax_highlighting());
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let config = Config {
        server_url: Some("https://ask.example.org".to_string()),
        model: Some("claude-sonnet".to_string()),
        reconnect_delay_ms: Some(500),
        ..Default::default()
    };
    config
        .save_to_path(&config_path)
        .expect("Failed to save config");
    let loaded = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(loaded, config);
    assert_eq!(loaded.reconnect_delay(), Duration::from_millis(500));

    let mut config = loaded;
    config.model = None;
    config
        .save_to_path(&config_path)
        .expect("Failed to save config");
    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(!contents.contains("model"));
    assert!(contents.contains("server_url = \"https://ask.example.org\""));
}

#[test]
fn test_invalid_toml_reports_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "server_url = [").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
fn test_env_overrides_file_values() {
    let config = Config {
        server_url: Some("http://from-file:8000".to_string()),
        model: Some("file-model".to_string()),
        ..Default::default()
    };
    let env: HashMap<&str, &str> = [(SERVER_URL_ENV, "http://from-env:9000"), (MODEL_ENV, "  ")]
        .into_iter()
        .collect();

    let config = config.with_overrides_from(|key| env.get(key).map(|v| v.to_string()));
    assert_eq!(config.server_url(), "http://from-env:9000");
    // Blank values do not clear what the file set.
    assert_eq!(config.model.as_deref(), Some("file-model"));
}

#[test]
fn test_history_path_override() {
    let config = Config {
        history_path: Some(PathBuf::from("/tmp/askportal-history")),
        ..Default::default()
    };
    assert_eq!(
        config.history_dir(),
        Some(PathBuf::from("/tmp/askportal-history"))
    );
}

#[test]
fn test_path_display_keeps_relative_paths() {
    assert_eq!(path_display("relative/config.toml"), "relative/config.toml");
}
