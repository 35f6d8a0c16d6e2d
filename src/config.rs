//! Configuration loaded from a TOML file.
//!
//! ```toml
//! host = "cache1"
//! port = 11211
//! interval_secs = 10
//!
//! [log]
//! file = "/var/log/mcstats.log"
//! shift_age = "daily"
//! level = "INFO"
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::collector::DEFAULT_PORT;

/// Configuration error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Config file could not be read.
    Read { path: String, message: String },
    /// Config file is not valid TOML for [`Config`].
    Parse(String),
    /// Unknown log level name.
    InvalidLevel(String),
    /// Unknown `shift_age` value.
    InvalidRotation(String),
    /// Log file path has no usable file name.
    InvalidDestination(String),
    /// Log file appender could not be created.
    Appender(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, message } => {
                write!(f, "cannot read config {}: {}", path, message)
            }
            ConfigError::Parse(msg) => write!(f, "invalid config: {}", msg),
            ConfigError::InvalidLevel(level) => write!(f, "unknown log level: {}", level),
            ConfigError::InvalidRotation(age) => write!(f, "invalid log shift_age: {}", age),
            ConfigError::InvalidDestination(file) => write!(f, "invalid log file: {}", file),
            ConfigError::Appender(msg) => write!(f, "cannot open log file: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Log rotation age: a period name or a number of files to keep.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ShiftAge {
    Count(u64),
    Period(String),
}

/// `[log]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `STDOUT`, `STDERR` or a file path. Absent means stdout.
    pub file: Option<String>,
    pub shift_age: Option<ShiftAge>,
    /// Size-based rotation in bytes.
    pub shift_size: Option<u64>,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            shift_age: None,
            shift_size: None,
            level: "INFO".to_string(),
        }
    }
}

/// Shortest poll interval the daemon will use.
pub const MIN_INTERVAL_SECS: u64 = 1;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Seconds between polls.
    pub interval_secs: u64,
    /// Socket timeout in seconds; unset means block indefinitely.
    pub timeout_secs: Option<u64>,
    pub log: Option<LogConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            interval_secs: 10,
            timeout_secs: None,
            log: None,
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Poll interval; values below one second are raised to one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(MIN_INTERVAL_SECS))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 11211);
        assert_eq!(config.interval(), Duration::from_secs(10));
        assert_eq!(config.timeout(), None);
        assert!(config.log.is_none());
    }

    #[test]
    fn full_config() {
        let config = Config::from_toml_str(
            r#"
            host = "cache1"
            port = 11212
            interval_secs = 30
            timeout_secs = 5

            [log]
            file = "/var/log/mcstats.log"
            shift_age = 7
            shift_size = 1048576
            level = "DEBUG"
            "#,
        )
        .unwrap();

        assert_eq!(config.host, "cache1");
        assert_eq!(config.port, 11212);
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        let log = config.log.unwrap();
        assert_eq!(log.file.as_deref(), Some("/var/log/mcstats.log"));
        assert_eq!(log.shift_age, Some(ShiftAge::Count(7)));
        assert_eq!(log.shift_size, Some(1_048_576));
        assert_eq!(log.level, "DEBUG");
    }

    #[test]
    fn zero_interval_is_clamped() {
        let config = Config::from_toml_str("interval_secs = 0").unwrap();
        assert_eq!(config.interval_secs, 0);
        assert_eq!(config.interval(), Duration::from_secs(1));
    }

    #[test]
    fn log_section_defaults_level() {
        let config = Config::from_toml_str("[log]\nshift_age = \"daily\"\n").unwrap();
        let log = config.log.unwrap();
        assert_eq!(log.level, "INFO");
        assert_eq!(log.shift_age, Some(ShiftAge::Period("daily".to_string())));
        assert_eq!(log.file, None);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let err = Config::from_toml_str("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"cache2\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.host, "cache2");
    }

    #[test]
    fn load_missing_file() {
        let err = Config::load("/nonexistent/mcstats.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/mcstats.toml"));
    }
}
