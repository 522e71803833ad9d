// Configuration File Support
//
// TOML configuration for the governor, its HTTP transport and logging, with
// environment variable overrides (RIFTGATE_*). A missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::governor::GovernorConfig;
use crate::transport::DEFAULT_REQUEST_TIMEOUT;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Admission control configuration
    pub governor: GovernorConfig,

    /// HTTP transport configuration
    pub transport: TransportConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    /// URL scheme used with the routing target host
    pub scheme: String,

    /// Replaces `{scheme}://{host}` for every request (proxies, local servers)
    pub base_url: Option<String>,

    /// Header the API key is sent in
    pub api_key_header: String,

    /// API key; usually supplied through RIFTGATE_API_KEY
    pub api_key: Option<String>,

    /// Default request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            base_url: None,
            api_key_header: "X-Riot-Token".to_string(),
            api_key: None,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or is invalid.
    /// If the config file does not exist, returns default configuration.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            let config = Self::default().apply_env_overrides();
            config.validate()?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file from {:?}", path))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file from {:?}", path))?
            .apply_env_overrides();

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse configuration from TOML text without overrides or validation
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML configuration")
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - RIFTGATE_LOG_LEVEL
    /// - RIFTGATE_LOG_FORMAT
    /// - RIFTGATE_GOVERNOR_ENABLED
    /// - RIFTGATE_HEADROOM
    /// - RIFTGATE_API_KEY
    /// - RIFTGATE_BASE_URL
    /// - RIFTGATE_TIMEOUT_SECS
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("RIFTGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("RIFTGATE_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Some(enabled) = lookup("RIFTGATE_GOVERNOR_ENABLED") {
            self.governor.enabled = enabled.parse().unwrap_or(self.governor.enabled);
        }
        if let Some(headroom) = lookup("RIFTGATE_HEADROOM") {
            if let Ok(headroom) = headroom.parse::<u32>() {
                self.governor.headroom = headroom;
            }
        }

        if let Some(key) = lookup("RIFTGATE_API_KEY") {
            if !key.is_empty() {
                self.transport.api_key = Some(key);
            }
        }
        if let Some(url) = lookup("RIFTGATE_BASE_URL") {
            self.transport.base_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(timeout) = lookup("RIFTGATE_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                if timeout > 0 {
                    self.transport.timeout_secs = timeout;
                }
            }
        }

        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        self.governor.validate().context("Invalid governor configuration")?;

        match self.transport.scheme.as_str() {
            "http" | "https" => {}
            other => anyhow::bail!("Invalid transport scheme: {}. Must be http or https", other),
        }
        if self.transport.timeout_secs == 0 {
            anyhow::bail!("Transport timeout must be > 0");
        }
        if self.transport.api_key_header.trim().is_empty() {
            anyhow::bail!("API key header name must not be empty");
        }

        Ok(())
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "compact");
        assert!(config.governor.enabled);
        assert_eq!(config.governor.headroom, 1);
        assert_eq!(config.transport.api_key_header, "X-Riot-Token");
        assert_eq!(config.transport.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_timeout() {
        let mut config = Config::default();
        config.transport.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_scheme() {
        let mut config = Config::default();
        config.transport.scheme = "ftp".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bubbles_governor_errors() {
        let mut config = Config::default();
        config.governor.app_windows.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("governor"));
    }

    #[test]
    fn test_load_from_nonexistent_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().with_extension("nonexistent");
        let config = Config::load_from_path(&path);
        assert!(config.is_ok());
    }

    #[test]
    fn test_parse_toml_config() {
        let toml_content = r#"
[logging]
level = "debug"
format = "json"

[governor]
headroom = 0
app_windows = ["long", "short", "burst"]

[transport]
base_url = "http://localhost:9000"
timeout_secs = 10
"#;

        let config = Config::from_toml(toml_content).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.governor.headroom, 0);
        assert_eq!(config.governor.app_windows, vec!["long", "short", "burst"]);
        assert_eq!(
            config.governor.app_rate_limit_header,
            "X-App-Rate-Limit",
            "unspecified fields keep defaults"
        );
        assert_eq!(
            config.transport.base_url.as_deref(),
            Some("http://localhost:9000")
        );
        assert_eq!(config.transport.timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_toml_file() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(
            temp_file.path(),
            "[governor]\nmethod_rate_limit_header = \"X-Endpoint-Limit\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.governor.method_rate_limit_header, "X-Endpoint-Limit");
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "[governor\nheadroom = ").unwrap();
        assert!(Config::load_from_path(temp_file.path()).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::default().apply_overrides(vars(&[
            ("RIFTGATE_LOG_LEVEL", "trace"),
            ("RIFTGATE_GOVERNOR_ENABLED", "false"),
            ("RIFTGATE_HEADROOM", "2"),
            ("RIFTGATE_API_KEY", "RGAPI-test"),
            ("RIFTGATE_TIMEOUT_SECS", "9"),
        ]));

        assert_eq!(config.logging.level, "trace");
        assert!(!config.governor.enabled);
        assert_eq!(config.governor.headroom, 2);
        assert_eq!(config.transport.api_key.as_deref(), Some("RGAPI-test"));
        assert_eq!(config.transport.timeout_secs, 9);
    }

    #[test]
    fn test_overrides_ignore_garbage() {
        let config = Config::default().apply_overrides(vars(&[
            ("RIFTGATE_GOVERNOR_ENABLED", "maybe"),
            ("RIFTGATE_HEADROOM", "-1"),
            ("RIFTGATE_TIMEOUT_SECS", "0"),
            ("RIFTGATE_API_KEY", ""),
        ]));

        assert!(config.governor.enabled);
        assert_eq!(config.governor.headroom, 1);
        assert_eq!(config.transport.timeout_secs, 3);
        assert!(config.transport.api_key.is_none());
    }

    #[test]
    fn test_log_level_conversion() {
        let mut config = Config::default();
        config.logging.level = "WARN".to_string();
        assert_eq!(config.log_level().unwrap(), tracing::Level::WARN);
    }
}
