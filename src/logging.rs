//! Log sink used by the collector and `tracing` subscriber setup.
//!
//! Library code talks to a [`LogSink`]; the default [`TracingSink`] forwards
//! to `tracing` events. [`init_logging`] installs the subscriber from an
//! optional [`LogConfig`], falling back to console output at info level when
//! the configuration is unusable.

use std::path::Path;

use tracing::{Level, error, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::{ConfigError, LogConfig, ShiftAge};

/// Receives leveled text messages.
pub trait LogSink {
    fn log(&self, level: Level, message: &str);
}

/// Forwards messages to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!("{}", message),
            Level::WARN => tracing::warn!("{}", message),
            Level::INFO => tracing::info!("{}", message),
            Level::DEBUG => tracing::debug!("{}", message),
            Level::TRACE => tracing::trace!("{}", message),
        }
    }
}

impl<T: LogSink + ?Sized> LogSink for &T {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message)
    }
}

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    Stderr,
    File(String),
}

/// A [`LogConfig`] with every field validated.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub destination: Destination,
    pub rotation: RotationPolicy,
    pub level: Level,
    /// Requested size-based rotation, which the file appender cannot honor.
    pub ignored_shift_size: Option<u64>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            destination: Destination::Stdout,
            rotation: RotationPolicy::Never,
            level: Level::INFO,
            ignored_shift_size: None,
        }
    }
}

/// Time-based rotation of the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPolicy {
    Never,
    Minutely,
    Hourly,
    Daily,
    /// Daily rotation keeping at most this many files.
    DailyKeep(usize),
}

impl RotationPolicy {
    fn rotation(self) -> Rotation {
        match self {
            RotationPolicy::Never => Rotation::NEVER,
            RotationPolicy::Minutely => Rotation::MINUTELY,
            RotationPolicy::Hourly => Rotation::HOURLY,
            RotationPolicy::Daily | RotationPolicy::DailyKeep(_) => Rotation::DAILY,
        }
    }
}

/// Parses a level name; `FATAL` and `UNKNOWN` map to error.
pub fn parse_level(name: &str) -> Result<Level, ConfigError> {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" | "FATAL" | "UNKNOWN" => Ok(Level::ERROR),
        _ => Err(ConfigError::InvalidLevel(name.to_string())),
    }
}

fn parse_rotation(shift_age: Option<&ShiftAge>) -> Result<RotationPolicy, ConfigError> {
    let Some(shift_age) = shift_age else {
        return Ok(RotationPolicy::Never);
    };
    match shift_age {
        ShiftAge::Count(0) => Err(ConfigError::InvalidRotation("0".to_string())),
        ShiftAge::Count(n) => Ok(RotationPolicy::DailyKeep(*n as usize)),
        ShiftAge::Period(period) => match period.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(RotationPolicy::Never),
            "minutely" => Ok(RotationPolicy::Minutely),
            "hourly" => Ok(RotationPolicy::Hourly),
            "daily" => Ok(RotationPolicy::Daily),
            _ => Err(ConfigError::InvalidRotation(period.clone())),
        },
    }
}

/// Validates a log configuration without touching the filesystem.
pub fn resolve(config: &LogConfig) -> Result<LogSettings, ConfigError> {
    let destination = match config.file.as_deref().map(str::trim) {
        None | Some("") => Destination::Stdout,
        Some(f) if f.eq_ignore_ascii_case("STDOUT") => Destination::Stdout,
        Some(f) if f.eq_ignore_ascii_case("STDERR") => Destination::Stderr,
        Some(f) => Destination::File(f.to_string()),
    };

    Ok(LogSettings {
        destination,
        rotation: parse_rotation(config.shift_age.as_ref())?,
        level: parse_level(&config.level)?,
        ignored_shift_size: config.shift_size,
    })
}

/// Builds the writer for `settings`.
///
/// A file destination gets a non-blocking writer whose guard must be kept
/// alive for as long as logging is needed.
fn make_writer(settings: &LogSettings) -> Result<(BoxMakeWriter, Option<WorkerGuard>), ConfigError> {
    match &settings.destination {
        Destination::Stdout => Ok((BoxMakeWriter::new(std::io::stdout), None)),
        Destination::Stderr => Ok((BoxMakeWriter::new(std::io::stderr), None)),
        Destination::File(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let prefix = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| ConfigError::InvalidDestination(file.clone()))?;

            let mut builder = RollingFileAppender::builder()
                .rotation(settings.rotation.rotation())
                .filename_prefix(prefix);
            if let RotationPolicy::DailyKeep(n) = settings.rotation {
                builder = builder.max_log_files(n);
            }
            let appender = builder
                .build(dir)
                .map_err(|e| ConfigError::Appender(e.to_string()))?;

            let (writer, guard) = tracing_appender::non_blocking(appender);
            Ok((BoxMakeWriter::new(writer), Some(guard)))
        }
    }
}

fn filter_for(level: Level) -> EnvFilter {
    let level = level.as_str().to_ascii_lowercase();
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mcstats={level},mcstatsd={level}")))
}

fn install(settings: &LogSettings, writer: BoxMakeWriter) {
    let ansi = !matches!(settings.destination, Destination::File(_));
    // Another subscriber may already be installed (tests, embedding apps).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(settings.level))
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .try_init();
}

/// Installs the global `tracing` subscriber.
///
/// `None` means console output at info level. An invalid configuration is
/// never fatal: the defaults are installed and the problem is logged.
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the life of the process.
pub fn init_logging(config: Option<&LogConfig>) -> Option<WorkerGuard> {
    let attempt = match config {
        None => Ok(LogSettings::default()),
        Some(config) => resolve(config),
    }
    .and_then(|settings| make_writer(&settings).map(|w| (settings, w)));

    match attempt {
        Ok((settings, (writer, guard))) => {
            install(&settings, writer);
            if let Some(size) = settings.ignored_shift_size {
                warn!(
                    "Size-based log rotation (shift_size={}) is not supported, ignoring",
                    size
                );
            }
            guard
        }
        Err(e) => {
            let settings = LogSettings::default();
            install(&settings, BoxMakeWriter::new(std::io::stdout));
            error!("Caught a problem with log settings");
            error!("{}", e);
            error!("Setting log settings to defaults");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink(RefCell<Vec<(Level, String)>>);

    impl LogSink for RecordingSink {
        fn log(&self, level: Level, message: &str) {
            self.0.borrow_mut().push((level, message.to_string()));
        }
    }

    fn log_config(file: Option<&str>, shift_age: Option<ShiftAge>, level: &str) -> LogConfig {
        LogConfig {
            file: file.map(String::from),
            shift_age,
            shift_size: None,
            level: level.to_string(),
        }
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("INFO").unwrap(), Level::INFO);
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("Warn").unwrap(), Level::WARN);
        assert_eq!(parse_level("FATAL").unwrap(), Level::ERROR);
        assert_eq!(parse_level("UNKNOWN").unwrap(), Level::ERROR);
        assert_eq!(
            parse_level("LOUD").unwrap_err(),
            ConfigError::InvalidLevel("LOUD".to_string())
        );
    }

    #[test]
    fn test_resolve_defaults_to_stdout() {
        let settings = resolve(&LogConfig::default()).unwrap();
        assert_eq!(settings, LogSettings::default());

        let settings = resolve(&log_config(Some("STDOUT"), None, "INFO")).unwrap();
        assert_eq!(settings.destination, Destination::Stdout);

        let settings = resolve(&log_config(Some("stderr"), None, "ERROR")).unwrap();
        assert_eq!(settings.destination, Destination::Stderr);
        assert_eq!(settings.level, Level::ERROR);
    }

    #[test]
    fn test_resolve_file_and_rotation() {
        let settings = resolve(&log_config(
            Some("/var/log/mcstats.log"),
            Some(ShiftAge::Count(7)),
            "DEBUG",
        ))
        .unwrap();
        assert_eq!(
            settings.destination,
            Destination::File("/var/log/mcstats.log".to_string())
        );
        assert_eq!(settings.rotation, RotationPolicy::DailyKeep(7));

        let settings = resolve(&log_config(
            Some("a.log"),
            Some(ShiftAge::Period("Hourly".into())),
            "INFO",
        ))
        .unwrap();
        assert_eq!(settings.rotation, RotationPolicy::Hourly);
    }

    #[test]
    fn test_resolve_rejects_bad_rotation() {
        let err = resolve(&log_config(
            Some("a.log"),
            Some(ShiftAge::Period("fortnightly".into())),
            "INFO",
        ))
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidRotation("fortnightly".to_string()));

        assert!(resolve(&log_config(None, Some(ShiftAge::Count(0)), "INFO")).is_err());
    }

    #[test]
    fn test_resolve_keeps_shift_size() {
        let mut config = log_config(Some("a.log"), None, "INFO");
        config.shift_size = Some(1_048_576);
        assert_eq!(resolve(&config).unwrap().ignored_shift_size, Some(1_048_576));
    }

    #[test]
    fn test_make_writer_creates_file_appender() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcstats.log");
        let settings = LogSettings {
            destination: Destination::File(path.to_string_lossy().into_owned()),
            ..LogSettings::default()
        };

        let (_writer, guard) = make_writer(&settings).unwrap();
        assert!(guard.is_some());
        drop(guard);
        assert!(path.exists());
    }

    #[test]
    fn test_sink_by_reference() {
        let sink = RecordingSink::default();
        let by_ref = &sink;
        by_ref.log(Level::ERROR, "Logging started");
        TracingSink.log(Level::INFO, "ignored by recorder");

        assert_eq!(
            sink.0.borrow().as_slice(),
            &[(Level::ERROR, "Logging started".to_string())]
        );
    }
}
