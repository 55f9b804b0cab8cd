//! Configuration management for esdump
//!
//! This module handles loading, parsing, and validating configuration from:
//! - Configuration files (TOML format)
//! - Command-line arguments (applied by the `cli` module)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Request timeout in seconds (0 disables the timeout)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Lifetime of a server-side scroll between two requests
    #[serde(default = "default_scroll_keep_alive")]
    pub scroll_keep_alive: String,

    /// Upper bound in seconds for the best-effort scroll release call
    #[serde(default = "default_release_timeout")]
    pub release_timeout: u64,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Draw a progress bar on stderr
    #[serde(default)]
    pub progress_bar: bool,
}

// Default value functions
fn default_timeout() -> u64 {
    60
}

fn default_scroll_keep_alive() -> String {
    "1m".to_string()
}

fn default_release_timeout() -> u64 {
    10
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            scroll_keep_alive: default_scroll_keep_alive(),
            release_timeout: default_release_timeout(),
            accept_invalid_certs: false,
        }
    }
}

impl ConnectionConfig {
    /// Per-request timeout, `None` when set to 0
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

/// Time units accepted by Elasticsearch for scroll keep-alive values
const TIME_UNITS: &[&str] = &["nanos", "micros", "ms", "s", "m", "h", "d"];

impl Config {
    /// Load configuration from a file
    ///
    /// When `path` is `None` the default location is used, and a missing
    /// default file yields the default configuration. An explicitly given
    /// path must exist.
    ///
    /// # Arguments
    /// * `path` - Optional path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::FileNotFound(p.display().to_string()).into());
                }
                p.to_path_buf()
            }
            None => {
                let p = Self::default_path();
                if !p.exists() {
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - `~/.esdump/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".esdump")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        if !is_valid_keep_alive(&self.connection.scroll_keep_alive) {
            return Err(ConfigError::InvalidValue {
                field: "connection.scroll_keep_alive".to_string(),
                value: self.connection.scroll_keep_alive.clone(),
            }
            .into());
        }

        if self.connection.release_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connection.release_timeout".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Get scroll release timeout as Duration
    pub fn release_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.release_timeout)
    }
}

/// Check an Elasticsearch time value such as `1m`, `30s` or `500ms`
fn is_valid_keep_alive(value: &str) -> bool {
    let digits = value.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return false;
    }
    TIME_UNITS.contains(&&value[digits..])
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
