//! Configuration management for the OTR analytics tagger.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/otr-analytics/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("file.path must not be empty when the file sink is selected")]
    EmptyFilePath,

    #[error("sink must be one of: file, tracing, memory, null; got {0}")]
    InvalidSink(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Which sink tagged events are sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Append JSON lines to `file.path`.
    #[default]
    File,
    /// Log through `tracing`.
    Tracing,
    /// Keep events in memory for the lifetime of the process.
    Memory,
    /// Discard events.
    Null,
}

impl std::str::FromStr for SinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(SinkKind::File),
            "tracing" => Ok(SinkKind::Tracing),
            "memory" => Ok(SinkKind::Memory),
            "null" => Ok(SinkKind::Null),
            _ => Err(ConfigError::InvalidSink(s.to_string())),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Tagging behaviour.
    pub analytics: AnalyticsConfig,

    /// File sink settings.
    pub file: FileSinkConfig,
}

/// Tagging behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Whether events are forwarded at all.
    pub enabled: bool,

    /// Sink receiving tagged events.
    pub sink: SinkKind,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Also log every event through `tracing`, whatever the sink.
    pub echo: bool,
}

/// File sink settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileSinkConfig {
    /// JSON-lines file events are appended to.
    pub path: PathBuf,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sink: SinkKind::File,
            log_level: "info".to_string(),
            echo: false,
        }
    }
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            path: default_events_path(),
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("otr-analytics")
        .join("config.toml")
}

/// Returns the default events file path.
pub fn default_events_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("otr-analytics")
        .join("events.jsonl")
}

/// Parses a boolean environment value.
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - OTR_ANALYTICS_ENABLED: Turn tagging on or off (true/false, 1/0)
    /// - OTR_ANALYTICS_SINK: Override the sink (file, tracing, memory, null)
    /// - OTR_ANALYTICS_LOG_LEVEL: Override log level
    /// - OTR_ANALYTICS_FILE: Override the events file path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("OTR_ANALYTICS_ENABLED") {
            match parse_bool(&value) {
                Some(enabled) => {
                    tracing::info!("Overriding enabled from environment: {}", enabled);
                    self.analytics.enabled = enabled;
                }
                None => tracing::warn!("Ignoring invalid OTR_ANALYTICS_ENABLED value: {}", value),
            }
        }

        if let Ok(value) = std::env::var("OTR_ANALYTICS_SINK") {
            if !value.is_empty() {
                match value.parse::<SinkKind>() {
                    Ok(sink) => {
                        tracing::info!("Overriding sink from environment: {:?}", sink);
                        self.analytics.sink = sink;
                    }
                    Err(e) => tracing::warn!("Ignoring OTR_ANALYTICS_SINK: {}", e),
                }
            }
        }

        if let Ok(level) = std::env::var("OTR_ANALYTICS_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.analytics.log_level = level;
            }
        }

        if let Ok(path) = std::env::var("OTR_ANALYTICS_FILE") {
            if !path.is_empty() {
                tracing::info!("Overriding events file from environment: {}", path);
                self.file.path = PathBuf::from(path);
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.analytics.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.analytics.log_level.clone()));
        }

        if self.analytics.sink == SinkKind::File && self.file.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyFilePath);
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "OTR_ANALYTICS_ENABLED",
        "OTR_ANALYTICS_SINK",
        "OTR_ANALYTICS_LOG_LEVEL",
        "OTR_ANALYTICS_FILE",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.analytics.enabled);
        assert_eq!(config.analytics.sink, SinkKind::File);
        assert_eq!(config.analytics.log_level, "info");
        assert!(!config.analytics.echo);
        assert!(config.file.path.ends_with("events.jsonl"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_paths() {
        assert!(default_config_path().ends_with("otr-analytics/config.toml"));
        assert!(default_events_path()
            .to_string_lossy()
            .contains("otr-analytics"));
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[analytics]
sink = "tracing"
log_level = "debug"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.analytics.sink, SinkKind::Tracing);
        assert_eq!(config.analytics.log_level, "debug");
        assert!(config.analytics.enabled);
        assert_eq!(config.file, FileSinkConfig::default());
    }

    #[test]
    fn test_from_toml_invalid_sink() {
        let toml = r#"
[analytics]
sink = "carrier-pigeon"
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("Invalid TOML configuration"));
    }

    #[test]
    fn test_from_toml_syntax_error_reports_position() {
        let err = Config::from_toml("[analytics\nenabled = true").unwrap_err();
        assert!(err.to_string().contains("at position"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = Config::default();
        config.analytics.enabled = false;
        config.analytics.sink = SinkKind::Null;
        config.file.path = PathBuf::from("/var/lib/otr/events.jsonl");

        let toml = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&toml).unwrap(), config);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.analytics.log_level = "warn".to_string();
        config.save(&path).unwrap();

        assert!(path.exists());
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "analytics = 5").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();
        config.analytics.log_level = "LOUD".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("LOUD".to_string()))
        );

        config.analytics.log_level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_file_path() {
        let mut config = Config::default();
        config.file.path = PathBuf::new();
        assert_eq!(config.validate(), Err(ConfigError::EmptyFilePath));

        config.analytics.sink = SinkKind::Tracing;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sink_kind_from_str() {
        assert_eq!("FILE".parse::<SinkKind>().unwrap(), SinkKind::File);
        assert_eq!("memory".parse::<SinkKind>().unwrap(), SinkKind::Memory);
        assert_eq!(
            "kafka".parse::<SinkKind>(),
            Err(ConfigError::InvalidSink("kafka".to_string()))
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("OTR_ANALYTICS_ENABLED", "false");
        std::env::set_var("OTR_ANALYTICS_SINK", "tracing");
        std::env::set_var("OTR_ANALYTICS_LOG_LEVEL", "trace");
        std::env::set_var("OTR_ANALYTICS_FILE", "/tmp/otr-events.jsonl");

        let mut config = Config::default();
        config.apply_env_overrides();
        clear_env();

        assert!(!config.analytics.enabled);
        assert_eq!(config.analytics.sink, SinkKind::Tracing);
        assert_eq!(config.analytics.log_level, "trace");
        assert_eq!(config.file.path, PathBuf::from("/tmp/otr-events.jsonl"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_ignore_invalid_values() {
        clear_env();
        std::env::set_var("OTR_ANALYTICS_ENABLED", "sometimes");
        std::env::set_var("OTR_ANALYTICS_SINK", "kafka");

        let mut config = Config::default();
        config.apply_env_overrides();
        clear_env();

        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_env_overrides_ignore_empty_values() {
        clear_env();
        std::env::set_var("OTR_ANALYTICS_LOG_LEVEL", "");
        std::env::set_var("OTR_ANALYTICS_FILE", "");

        let mut config = Config::default();
        config.apply_env_overrides();
        clear_env();

        assert_eq!(config, Config::default());
    }
}
