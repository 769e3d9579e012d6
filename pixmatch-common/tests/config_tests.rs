//! Integration tests for TOML config loading and graceful degradation
//!
//! - Missing TOML files do not cause failure
//! - Present files are parsed into TomlConfig
//! - Unparseable files surface a configuration error

use pixmatch_common::config::{default_config_path, load_toml_config, CompiledDefaults, CONFIG_DIR_NAME};
use pixmatch_common::Error;
use std::fs;

#[test]
fn test_missing_config_file_returns_none() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("does-not-exist.toml");

    let config = load_toml_config(&path).unwrap();
    assert!(config.is_none(), "Missing config should fall back to defaults");
}

#[test]
fn test_full_config_file_is_loaded() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("pixmatch.toml");
    fs::write(
        &path,
        r#"
host = "0.0.0.0"
port = 6100
gemini_api_key = "toml-key"

[logging]
level = "debug"

[scan]
batch_size = 8
max_library_size = 50
similarity_threshold = 60
response_language = "Brazilian Portuguese"
max_upload_bytes = 1048576

[gemini]
model = "gemini-2.5-flash"
base_url = "http://localhost:9999/v1beta"
request_timeout_secs = 10
max_requests_per_minute = 12
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap().expect("config should load");

    assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
    assert_eq!(config.port, Some(6100));
    assert_eq!(config.gemini_api_key.as_deref(), Some("toml-key"));
    assert_eq!(config.logging.level.as_deref(), Some("debug"));
    assert_eq!(config.scan.batch_size, Some(8));
    assert_eq!(config.scan.max_library_size, Some(50));
    assert_eq!(config.scan.similarity_threshold, Some(60));
    assert_eq!(config.scan.response_language.as_deref(), Some("Brazilian Portuguese"));
    assert_eq!(config.scan.max_upload_bytes, Some(1_048_576));
    assert_eq!(config.gemini.model.as_deref(), Some("gemini-2.5-flash"));
    assert_eq!(config.gemini.request_timeout_secs, Some(10));
    assert_eq!(config.gemini.max_requests_per_minute, Some(12));
}

#[test]
fn test_malformed_config_file_is_config_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "[scan\nbatch_size = ").unwrap();

    let result = load_toml_config(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_default_config_path_uses_pixmatch_dir() {
    if let Some(path) = default_config_path("pixmatch.toml") {
        assert!(path.ends_with(format!("{}/pixmatch.toml", CONFIG_DIR_NAME)));
    }
}

#[test]
fn test_compiled_defaults() {
    let defaults = CompiledDefaults::default();
    assert_eq!(defaults.port, 5780);
    assert_eq!(defaults.max_library_size, 100);
    assert_eq!(defaults.similarity_threshold, 40);
    assert!(defaults.batch_size >= 1);
}
