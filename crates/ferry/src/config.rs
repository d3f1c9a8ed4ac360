//! Configuration management for Ferry.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/ferry/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handlers::http::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
use crate::handlers::remote::DEFAULT_REMOTE_TIMEOUT;
use crate::handlers::resolve::MAVEN_CENTRAL;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("parallel threads must be between 1 and 256, got {0}")]
    InvalidThreads(usize),

    #[error("{0} must be greater than 0")]
    ZeroTimeout(&'static str),

    #[error("resolve repository at index {0} is empty")]
    EmptyRepository(usize),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `parallel.threads`.
const MAX_THREADS: usize = 256;

/// Main configuration structure for Ferry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,

    /// Credentials seeded into the transfer manager.
    pub transfer: TransferConfig,

    /// HTTP client settings.
    pub http: HttpConfig,

    /// SFTP and SMB settings.
    pub remote: RemoteConfig,

    /// Artifact resolution settings.
    pub resolve: ResolveConfig,

    /// Parallel fan-out settings.
    pub parallel: ParallelConfig,
}

/// General configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Scratch directory used by `download_to_temp`.
    pub temp_dir: PathBuf,
}

/// Transfer credentials. Both user and password are needed for them to count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct TransferConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    /// SMB domain.
    pub domain: Option<String>,
}

/// HTTP configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

/// Remote file system configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    pub timeout_secs: u64,
}

/// Artifact resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolveConfig {
    /// Repositories searched in order.
    pub repositories: Vec<String>,
}

/// Parallel fan-out configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParallelConfig {
    /// Worker threads used by CLI fan-out.
    pub threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            temp_dir: std::env::temp_dir().join("ferry"),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_REMOTE_TIMEOUT.as_secs(),
        }
    }
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            repositories: vec![MAVEN_CENTRAL.to_string()],
        }
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self { threads: 4 }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ferry")
        .join("config.toml")
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - FERRY_TRANSFER_USER: Override transfer user
    /// - FERRY_TRANSFER_PASSWORD: Override transfer password
    /// - FERRY_TRANSFER_DOMAIN: Override SMB domain
    /// - FERRY_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Some(user) = env_override("FERRY_TRANSFER_USER") {
            tracing::info!("Overriding transfer user from environment: {}", user);
            self.transfer.user = Some(user);
        }

        if let Some(password) = env_override("FERRY_TRANSFER_PASSWORD") {
            tracing::info!("Overriding transfer password from environment");
            self.transfer.password = Some(password);
        }

        if let Some(domain) = env_override("FERRY_TRANSFER_DOMAIN") {
            tracing::info!("Overriding transfer domain from environment: {}", domain);
            self.transfer.domain = Some(domain);
        }

        if let Some(level) = env_override("FERRY_LOG_LEVEL") {
            tracing::info!("Overriding log_level from environment: {}", level);
            self.general.log_level = level;
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.general.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.general.log_level.clone()));
        }

        if !(1..=MAX_THREADS).contains(&self.parallel.threads) {
            return Err(ConfigError::InvalidThreads(self.parallel.threads));
        }

        if self.http.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("http.connect_timeout_secs"));
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("http.request_timeout_secs"));
        }
        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("remote.timeout_secs"));
        }

        if let Some(index) = self
            .resolve
            .repositories
            .iter()
            .position(|repo| repo.trim().is_empty())
        {
            return Err(ConfigError::EmptyRepository(index));
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
        "FERRY_TRANSFER_USER",
        "FERRY_TRANSFER_PASSWORD",
        "FERRY_TRANSFER_DOMAIN",
        "FERRY_LOG_LEVEL",
    ];

    fn clear_env() {
        for name in ENV_VARS {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.general.log_level, "info");
        assert!(config.general.temp_dir.ends_with("ferry"));
        assert_eq!(config.transfer, TransferConfig::default());
        assert_eq!(config.http.connect_timeout_secs, 30);
        assert_eq!(config.http.request_timeout_secs, 300);
        assert_eq!(config.remote.timeout_secs, 60);
        assert_eq!(config.resolve.repositories, vec![MAVEN_CENTRAL]);
        assert_eq!(config.parallel.threads, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[transfer]
user = "deployer"
password = "secret"

[parallel]
threads = 8
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.transfer.user.as_deref(), Some("deployer"));
        assert_eq!(config.transfer.password.as_deref(), Some("secret"));
        assert_eq!(config.transfer.domain, None);
        assert_eq!(config.parallel.threads, 8);
        assert_eq!(config.http, HttpConfig::default());
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[general]
log_level = "trace"
temp_dir = "/var/tmp/ferry"

[transfer]
user = "svc"
password = "pw"
domain = "CORP"

[http]
connect_timeout_secs = 5
request_timeout_secs = 10

[remote]
timeout_secs = 15

[resolve]
repositories = ["https://repo.internal/maven", "/srv/m2"]

[parallel]
threads = 2
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.general.log_level, "trace");
        assert_eq!(config.general.temp_dir, PathBuf::from("/var/tmp/ferry"));
        assert_eq!(config.transfer.domain.as_deref(), Some("CORP"));
        assert_eq!(config.http.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.http.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.remote.timeout(), Duration::from_secs(15));
        assert_eq!(
            config.resolve.repositories,
            vec!["https://repo.internal/maven", "/srv/m2"]
        );
        assert_eq!(config.parallel.threads, 2);
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let toml = r#"
[general
log_level = "debug"
"#;
        let err = Config::from_toml(toml).unwrap_err().to_string();
        assert!(err.contains("Invalid TOML"));
    }

    #[test]
    fn test_from_toml_wrong_type() {
        let toml = r#"
[parallel]
threads = "many"
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_roundtrip_custom() {
        let mut original = Config::default();
        original.general.log_level = "warn".to_string();
        original.transfer.user = Some("u".to_string());
        original.transfer.password = Some("p".to_string());
        original.resolve.repositories.push("/srv/m2".to_string());

        let toml = original.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[parallel]"));

        let loaded = Config::from_toml(&toml).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_missing_file() {
        let config = Config::load("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.parallel.threads = 16;
        original.save(&config_path).unwrap();

        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[http]\nconnect_timeout_secs = -").unwrap();

        let err = format!("{:#}", Config::load(&config_path).unwrap_err());
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("ferry/config.toml"));
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();
        config.general.log_level = "DEBUG".to_string();
        assert!(config.validate().is_ok());

        config.general.log_level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );
    }

    #[test]
    fn test_validate_threads() {
        let mut config = Config::default();
        config.parallel.threads = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidThreads(0)));

        config.parallel.threads = 257;
        assert_eq!(config.validate(), Err(ConfigError::InvalidThreads(257)));

        config.parallel.threads = 256;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeouts() {
        let mut config = Config::default();
        config.remote.timeout_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroTimeout("remote.timeout_secs"))
        );

        let mut config = Config::default();
        config.http.request_timeout_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroTimeout("http.request_timeout_secs"))
        );
    }

    #[test]
    fn test_validate_repositories() {
        let mut config = Config::default();
        config.resolve.repositories = vec!["/srv/m2".to_string(), "  ".to_string()];
        assert_eq!(config.validate(), Err(ConfigError::EmptyRepository(1)));

        config.resolve.repositories.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("FERRY_TRANSFER_USER", "env-user");
        std::env::set_var("FERRY_TRANSFER_PASSWORD", "env-pass");
        std::env::set_var("FERRY_TRANSFER_DOMAIN", "ENV");
        std::env::set_var("FERRY_LOG_LEVEL", "debug");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.transfer.user.as_deref(), Some("env-user"));
        assert_eq!(config.transfer.password.as_deref(), Some("env-pass"));
        assert_eq!(config.transfer.domain.as_deref(), Some("ENV"));
        assert_eq!(config.general.log_level, "debug");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_overrides_empty_ignored() {
        clear_env();
        std::env::set_var("FERRY_TRANSFER_USER", "");

        let mut config = Config::default();
        config.transfer.user = Some("file-user".to_string());
        config.apply_env_overrides();

        assert_eq!(config.transfer.user.as_deref(), Some("file-user"));
        assert_eq!(config.general.log_level, "info");

        clear_env();
    }
}
