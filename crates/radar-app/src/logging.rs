//! Structured logging bootstrap.
//!
//! Events go to stderr so stdout stays free for heatmap frames. `RUST_LOG`
//! takes precedence over the configured level.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (machine-readable)
    Json,
    /// Pretty format (human-readable, colored)
    Pretty,
    /// Compact format (one line per event)
    #[default]
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,

    /// Directive string overriding `level` (e.g. "radar_signal=trace,info")
    pub filter: Option<String>,
}

impl LogConfig {
    /// Same configuration at debug level or finer
    pub fn verbose(mut self) -> Self {
        if !matches!(self.level, LogLevel::Trace) {
            self.level = LogLevel::Debug;
        }
        self
    }

    fn env_filter(&self) -> EnvFilter {
        if let Some(custom) = &self.filter {
            if let Ok(filter) = EnvFilter::try_new(custom) {
                return filter;
            }
        }

        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) -> radar_core::Result<()> {
    let filter = config.env_filter();
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| radar_core::Error::Config(format!("logging already initialized: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn test_verbose_never_coarsens() {
        assert_eq!(LogConfig::default().verbose().level, LogLevel::Debug);

        let trace = LogConfig {
            level: LogLevel::Trace,
            ..Default::default()
        };
        assert_eq!(trace.verbose().level, LogLevel::Trace);
    }

    #[test]
    fn test_level_serde_lowercase() {
        let config: LogConfig =
            serde_json::from_str(r#"{"level": "warn", "format": "json"}"#).unwrap();
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_second_init_reports_error() {
        let config = LogConfig {
            level: LogLevel::Error,
            ..Default::default()
        };
        // The first call may succeed or lose to another test; the second must
        // fail without panicking
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
