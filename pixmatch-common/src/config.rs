//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument / environment variable (handled by each binary via clap)
//! 2. TOML config file
//! 3. Compiled defaults (fallback)
//!
//! A missing TOML file is never fatal: the service logs a warning and starts
//! on compiled defaults. A TOML file that exists but cannot be parsed is a
//! configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform config directory
pub const CONFIG_DIR_NAME: &str = "pixmatch";

/// Built-in defaults used when neither CLI, ENV nor TOML provide a value
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub batch_size: usize,
    pub max_library_size: usize,
    pub similarity_threshold: u8,
    pub response_language: String,
    pub max_upload_bytes: usize,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub request_timeout_secs: u64,
    pub max_requests_per_minute: u32,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
            log_level: "info".to_string(),
            batch_size: 5,
            max_library_size: 100,
            similarity_threshold: 40,
            response_language: "English".to_string(),
            max_upload_bytes: 256 * 1024 * 1024,
            gemini_model: "gemini-3-flash-preview".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            request_timeout_secs: 120,
            max_requests_per_minute: 60,
        }
    }
}

/// TOML configuration file contents
///
/// Every field is optional so that partial files are valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Address the HTTP server binds to
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Credential for the external comparison service
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,
}

/// `[scan]` section: batching and ingestion limits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Candidates submitted per external call
    #[serde(default)]
    pub batch_size: Option<usize>,

    /// Maximum number of candidate images kept per library upload
    #[serde(default)]
    pub max_library_size: Option<usize>,

    /// Minimum similarity (0-100) the model is asked to report
    #[serde(default)]
    pub similarity_threshold: Option<u8>,

    /// Language the model writes match rationales in
    #[serde(default)]
    pub response_language: Option<String>,

    /// Request body limit for uploads
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,
}

/// `[gemini]` section: external service connection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub max_requests_per_minute: Option<u32>,
}

/// Default config file location: `<config_dir>/pixmatch/<file_name>`
///
/// Returns `None` on platforms where no config directory can be determined.
pub fn default_config_path(file_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(file_name))
}

/// Load a TOML config file
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file not found, using compiled defaults"
        );
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let config = parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    info!(path = %path.display(), "Loaded config file");
    Ok(Some(config))
}

/// Parse TOML text into a [`TomlConfig`]
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config = parse_toml_config("").unwrap();
        assert_eq!(config, TomlConfig::default());
    }

    #[test]
    fn test_parse_partial_config() {
        let config = parse_toml_config(
            r#"
            port = 6000

            [scan]
            batch_size = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.port, Some(6000));
        assert_eq!(config.scan.batch_size, Some(3));
        assert!(config.host.is_none());
        assert!(config.gemini.model.is_none());
    }

    #[test]
    fn test_parse_invalid_config_is_error() {
        let result = parse_toml_config("port = \"not a number\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_default_batch_size_is_five() {
        assert_eq!(CompiledDefaults::default().batch_size, 5);
    }
}
