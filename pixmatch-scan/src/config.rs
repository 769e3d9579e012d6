//! Configuration resolution for pixmatch-scan
//!
//! Provides multi-tier resolution with CLI/ENV → TOML → compiled default
//! priority. clap merges the first two tiers (each argument carries an
//! `env` fallback).

use clap::Parser;
use pixmatch_common::config::{CompiledDefaults, TomlConfig};
use pixmatch_common::{Error, Result};
use std::path::PathBuf;
use tracing::{info, warn};

/// Default config file name under `<config_dir>/pixmatch/`
pub const CONFIG_FILE_NAME: &str = "pixmatch.toml";

/// Command-line arguments for pixmatch-scan
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "pixmatch-scan")]
#[command(about = "Visual similarity search over uploaded images")]
#[command(version)]
pub struct CliArgs {
    /// Address to bind the HTTP server to
    #[arg(long, env = "PIXMATCH_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PIXMATCH_PORT")]
    pub port: Option<u16>,

    /// Path to the TOML config file
    #[arg(short, long, env = "PIXMATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Comparison service API key
    #[arg(long, env = "PIXMATCH_GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Candidates submitted per comparison call
    #[arg(short, long, env = "PIXMATCH_BATCH_SIZE")]
    pub batch_size: Option<usize>,
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub scan: ScanSettings,
    pub comparison: ComparisonSettings,
}

/// Batching and ingestion limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Candidates per external call (at least 1)
    pub batch_size: usize,
    /// Images kept per library upload
    pub max_library_size: usize,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        let defaults = CompiledDefaults::default();
        Self {
            batch_size: defaults.batch_size,
            max_library_size: defaults.max_library_size,
            max_upload_bytes: defaults.max_upload_bytes,
        }
    }
}

/// Settings for the external comparison client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub max_requests_per_minute: u32,
    pub similarity_threshold: u8,
    pub response_language: String,
}

impl ServiceSettings {
    /// Merge CLI/ENV arguments, optional TOML and compiled defaults
    pub fn resolve(args: &CliArgs, toml: Option<&TomlConfig>) -> Result<Self> {
        let defaults = CompiledDefaults::default();
        let empty = TomlConfig::default();
        let toml = toml.unwrap_or(&empty);

        let batch_size = args
            .batch_size
            .or(toml.scan.batch_size)
            .unwrap_or(defaults.batch_size);
        if batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }

        let similarity_threshold = toml
            .scan
            .similarity_threshold
            .unwrap_or(defaults.similarity_threshold);
        if similarity_threshold > 100 {
            return Err(Error::Config(format!(
                "similarity_threshold must be between 0 and 100, got {}",
                similarity_threshold
            )));
        }

        let api_key = resolve_api_key(args.api_key.as_deref(), toml.gemini_api_key.as_deref());
        if api_key.is_none() {
            warn!(
                "Comparison service API key not configured; scans will fail until one is set via \
                 --api-key, PIXMATCH_GEMINI_API_KEY or gemini_api_key in {}",
                CONFIG_FILE_NAME
            );
        }

        Ok(Self {
            host: args
                .host
                .clone()
                .or_else(|| toml.host.clone())
                .unwrap_or(defaults.host),
            port: args.port.or(toml.port).unwrap_or(defaults.port),
            log_level: toml.logging.level.clone().unwrap_or(defaults.log_level),
            scan: ScanSettings {
                batch_size,
                max_library_size: toml
                    .scan
                    .max_library_size
                    .unwrap_or(defaults.max_library_size),
                max_upload_bytes: toml
                    .scan
                    .max_upload_bytes
                    .unwrap_or(defaults.max_upload_bytes),
            },
            comparison: ComparisonSettings {
                api_key,
                model: toml.gemini.model.clone().unwrap_or(defaults.gemini_model),
                base_url: toml
                    .gemini
                    .base_url
                    .clone()
                    .unwrap_or(defaults.gemini_base_url),
                request_timeout_secs: toml
                    .gemini
                    .request_timeout_secs
                    .unwrap_or(defaults.request_timeout_secs),
                max_requests_per_minute: toml
                    .gemini
                    .max_requests_per_minute
                    .unwrap_or(defaults.max_requests_per_minute),
                similarity_threshold,
                response_language: toml
                    .scan
                    .response_language
                    .clone()
                    .unwrap_or(defaults.response_language),
            },
        })
    }

    /// `host:port` for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Resolve the comparison API key
///
/// **Priority:** CLI/ENV → TOML
pub fn resolve_api_key(cli_or_env: Option<&str>, toml: Option<&str>) -> Option<String> {
    let cli_key = cli_or_env.filter(|k| is_valid_key(k));
    let toml_key = toml.filter(|k| is_valid_key(k));

    if cli_key.is_some() && toml_key.is_some() {
        warn!(
            "Comparison API key found in multiple sources: command line/environment, TOML. \
             Using command line/environment (highest priority)."
        );
    }

    if let Some(key) = cli_key {
        info!("Comparison API key loaded from command line/environment");
        return Some(key.trim().to_string());
    }
    if let Some(key) = toml_key {
        info!("Comparison API key loaded from TOML config");
        return Some(key.trim().to_string());
    }
    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   \t"));
    }

    #[test]
    fn test_api_key_priority() {
        assert_eq!(resolve_api_key(Some("cli"), Some("toml")), Some("cli".to_string()));
        assert_eq!(resolve_api_key(None, Some("toml")), Some("toml".to_string()));
        assert_eq!(resolve_api_key(Some("  "), Some("toml")), Some("toml".to_string()));
        assert_eq!(resolve_api_key(None, None), None);
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = ServiceSettings::resolve(&CliArgs::default(), None).unwrap();
        let defaults = CompiledDefaults::default();

        assert_eq!(settings.port, defaults.port);
        assert_eq!(settings.scan.batch_size, 5);
        assert_eq!(settings.comparison.similarity_threshold, 40);
        assert!(settings.comparison.api_key.is_none());
        assert_eq!(settings.bind_address(), "127.0.0.1:5780");
    }

    #[test]
    fn test_cli_overrides_toml() {
        let mut toml = TomlConfig::default();
        toml.port = Some(7000);
        toml.scan.batch_size = Some(3);
        toml.gemini.model = Some("toml-model".to_string());

        let args = CliArgs {
            port: Some(8000),
            ..Default::default()
        };

        let settings = ServiceSettings::resolve(&args, Some(&toml)).unwrap();
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.scan.batch_size, 3);
        assert_eq!(settings.comparison.model, "toml-model");
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let args = CliArgs {
            batch_size: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            ServiceSettings::resolve(&args, None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_threshold_above_100_rejected() {
        let mut toml = TomlConfig::default();
        toml.scan.similarity_threshold = Some(101);
        assert!(ServiceSettings::resolve(&CliArgs::default(), Some(&toml)).is_err());
    }
}
