//! Configuration management for the fileshell daemon.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/fileshell/daemon.toml`.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("bind_address must be an IPv4 or IPv6 address, got {0}")]
    InvalidBindAddress(String),

    #[error("allowed_programs must not be empty")]
    EmptyAllowList,

    #[error("allowed program must be a bare program name, got {0:?}")]
    UnsafeProgram(String),

    #[error("allowed program not found in PATH: {0}")]
    ProgramNotFound(String),

    #[error("chunk_size must be between 1 and {max}, got {value}")]
    InvalidChunkSize { value: usize, max: usize },
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Largest accepted transfer chunk.
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Main configuration structure for the fileshell daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General daemon configuration.
    pub daemon: DaemonConfig,

    /// Listening socket configuration.
    pub network: NetworkConfig,

    /// Read-only command proxy configuration.
    pub proxy: ProxyConfig,

    /// File transfer configuration.
    pub transfer: TransferConfig,
}

/// General daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Directory for daily rolling log files. Logs go to stdout when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

/// Listening socket configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind the listener to.
    pub bind_address: String,
}

/// Proxy executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Programs remote clients may run.
    pub allowed_programs: Vec<String>,
}

/// File transfer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransferConfig {
    /// Bytes per read/write when streaming bodies and proxy output.
    pub chunk_size: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allowed_programs: vec!["ls".to_string(), "pwd".to_string(), "md5sum".to_string()],
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: protocol::CHUNK_SIZE,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fileshell")
        .join("daemon.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - FILESHELL_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - FILESHELL_BIND_ADDRESS: Override listening address
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("FILESHELL_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.daemon.log_level = level;
            }
        }

        if let Ok(address) = std::env::var("FILESHELL_BIND_ADDRESS") {
            if !address.is_empty() {
                tracing::info!("Overriding bind_address from environment: {}", address);
                self.network.bind_address = address;
            }
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.daemon.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.daemon.log_level.clone()));
        }

        if self.network.bind_address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddress(
                self.network.bind_address.clone(),
            ));
        }

        if self.proxy.allowed_programs.is_empty() {
            return Err(ConfigError::EmptyAllowList);
        }

        for program in &self.proxy.allowed_programs {
            // Entries are matched against the first word of a command line,
            // so anything a shell or path lookup would interpret is refused.
            if program.is_empty()
                || program.contains('/')
                || program.chars().any(|c| c.is_whitespace() || c.is_control())
            {
                return Err(ConfigError::UnsafeProgram(program.clone()));
            }

            if which::which(program).is_err() {
                return Err(ConfigError::ProgramNotFound(program.clone()));
            }
        }

        let chunk_size = self.transfer.chunk_size;
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::InvalidChunkSize {
                value: chunk_size,
                max: MAX_CHUNK_SIZE,
            });
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
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

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.daemon.log_level, "info");
        assert!(config.daemon.log_dir.is_none());
        assert_eq!(config.network.bind_address, "0.0.0.0");
        assert_eq!(config.proxy.allowed_programs, vec!["ls", "pwd", "md5sum"]);
        assert_eq!(config.transfer.chunk_size, 500);
    }

    #[test]
    fn test_from_toml_empty() {
        // Empty TOML should use all defaults
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[daemon]
log_level = "debug"

[transfer]
chunk_size = 4096
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.daemon.log_level, "debug");
        assert_eq!(config.transfer.chunk_size, 4096);
        // Other values should be defaults
        assert_eq!(config.network.bind_address, "0.0.0.0");
        assert_eq!(config.proxy.allowed_programs.len(), 3);
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[daemon]
log_level = "trace"
log_dir = "/var/log/fileshell"

[network]
bind_address = "::1"

[proxy]
allowed_programs = ["ls"]

[transfer]
chunk_size = 1
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.daemon.log_level, "trace");
        assert_eq!(
            config.daemon.log_dir,
            Some(PathBuf::from("/var/log/fileshell"))
        );
        assert_eq!(config.network.bind_address, "::1");
        assert_eq!(config.proxy.allowed_programs, vec!["ls"]);
        assert_eq!(config.transfer.chunk_size, 1);
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let toml = r#"
[daemon
log_level = "debug"
"#;
        let result = Config::from_toml(toml);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Invalid TOML"));
    }

    #[test]
    fn test_from_toml_wrong_type() {
        let toml = r#"
[transfer]
chunk_size = "large"
"#;
        let result = Config::from_toml(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();

        assert!(toml.contains("[daemon]"));
        assert!(toml.contains("[network]"));
        assert!(toml.contains("[proxy]"));
        assert!(toml.contains("[transfer]"));
        assert!(!toml.contains("log_dir"));
    }

    #[test]
    fn test_roundtrip_custom() {
        let mut original = Config::default();
        original.daemon.log_level = "warn".to_string();
        original.daemon.log_dir = Some(PathBuf::from("/tmp/logs"));
        original.proxy.allowed_programs = vec!["ls".to_string()];
        original.transfer.chunk_size = 8192;

        let toml = original.to_toml().unwrap();
        let loaded = Config::from_toml(&toml).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_missing_file() {
        let config = Config::load("/nonexistent/path/daemon.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("daemon.toml");

        let mut original = Config::default();
        original.network.bind_address = "127.0.0.1".to_string();

        original.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("daemon.toml");

        fs::write(&config_path, "invalid [ toml").unwrap();

        let result = Config::load(&config_path);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("fileshell"));
        assert!(path.to_string_lossy().ends_with("daemon.toml"));
    }

    #[test]
    #[serial]
    fn test_env_override_log_level() {
        std::env::remove_var("FILESHELL_BIND_ADDRESS");
        std::env::set_var("FILESHELL_LOG_LEVEL", "debug");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.daemon.log_level, "debug");

        std::env::remove_var("FILESHELL_LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_env_override_bind_address() {
        std::env::remove_var("FILESHELL_LOG_LEVEL");
        std::env::set_var("FILESHELL_BIND_ADDRESS", "127.0.0.1");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.network.bind_address, "127.0.0.1");

        std::env::remove_var("FILESHELL_BIND_ADDRESS");
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        std::env::set_var("FILESHELL_LOG_LEVEL", "");
        std::env::set_var("FILESHELL_BIND_ADDRESS", "");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config, Config::default());

        std::env::remove_var("FILESHELL_LOG_LEVEL");
        std::env::remove_var("FILESHELL_BIND_ADDRESS");
    }

    #[test]
    #[serial]
    fn test_env_override_unset_does_not_override() {
        std::env::remove_var("FILESHELL_LOG_LEVEL");
        std::env::remove_var("FILESHELL_BIND_ADDRESS");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();
        config.daemon.log_level = "WARN".to_string();
        assert!(config.validate().is_ok());

        config.daemon.log_level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );
    }

    #[test]
    fn test_validate_bind_address() {
        let mut config = Config::default();
        config.network.bind_address = "::".to_string();
        assert!(config.validate().is_ok());

        config.network.bind_address = "localhost".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidBindAddress("localhost".to_string()))
        );
    }

    #[test]
    fn test_validate_empty_allow_list() {
        let mut config = Config::default();
        config.proxy.allowed_programs.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyAllowList));
    }

    #[test]
    fn test_validate_unsafe_programs() {
        for program in ["", "/bin/ls", "ls -l", "../ls", "ls\n"] {
            let mut config = Config::default();
            config.proxy.allowed_programs = vec![program.to_string()];
            assert_eq!(
                config.validate(),
                Err(ConfigError::UnsafeProgram(program.to_string())),
                "program {program:?}"
            );
        }
    }

    #[test]
    fn test_validate_unknown_program() {
        let mut config = Config::default();
        config.proxy.allowed_programs = vec!["fileshell-no-such-program".to_string()];
        assert_eq!(
            config.validate(),
            Err(ConfigError::ProgramNotFound(
                "fileshell-no-such-program".to_string()
            ))
        );
    }

    #[test]
    fn test_validate_chunk_size_bounds() {
        let mut config = Config::default();

        config.transfer.chunk_size = 1;
        assert!(config.validate().is_ok());

        config.transfer.chunk_size = MAX_CHUNK_SIZE;
        assert!(config.validate().is_ok());

        config.transfer.chunk_size = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidChunkSize {
                value: 0,
                max: MAX_CHUNK_SIZE
            })
        );

        config.transfer.chunk_size = MAX_CHUNK_SIZE + 1;
        assert!(config.validate().is_err());
    }
}
