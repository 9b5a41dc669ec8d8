//! Structured logging.
//!
//! Access-log entries are built as plain [`LogEntry`] values and handed to
//! `tracing` under the [`ACCESS_TARGET`] target. Building and emitting are
//! separate so the formatting can be checked without a subscriber.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{LogFormat, ObservabilityConfig};

/// `tracing` target for access-log entries.
pub const ACCESS_TARGET: &str = "request_pipeline::access";

/// Severity of a log entry. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Level::from(*self), f)
    }
}

/// A single formatted log line with its severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub message: String,
    pub level: LogLevel,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }

    /// Raise the level to at least `Info`.
    pub fn promoted(mut self) -> Self {
        self.level = self.level.max(LogLevel::Info);
        self
    }

    /// Hand the entry to the installed subscriber.
    pub fn emit(&self) {
        let message = self.message.as_str();
        match self.level {
            LogLevel::Trace => tracing::trace!(target: ACCESS_TARGET, "{message}"),
            LogLevel::Debug => tracing::debug!(target: ACCESS_TARGET, "{message}"),
            LogLevel::Info => tracing::info!(target: ACCESS_TARGET, "{message}"),
            LogLevel::Warn => tracing::warn!(target: ACCESS_TARGET, "{message}"),
            LogLevel::Error => tracing::error!(target: ACCESS_TARGET, "{message}"),
        }
    }
}

/// Per-path severity lookup supplied by the host.
pub type SeverityPolicy = Arc<dyn Fn(&str) -> LogLevel + Send + Sync>;

/// Every path logs at `Info`.
pub fn default_severity() -> SeverityPolicy {
    Arc::new(|_| LogLevel::Info)
}

/// Paths in `quiet` log at `level`, everything else at `Info`.
pub fn quiet_paths(quiet: Vec<String>, level: LogLevel) -> SeverityPolicy {
    Arc::new(move |path| {
        if quiet.iter().any(|p| p == path) {
            level
        } else {
            LogLevel::Info
        }
    })
}

/// Build the severity policy described by the observability config.
pub fn severity_from_config(config: &ObservabilityConfig) -> SeverityPolicy {
    if config.quiet_paths.is_empty() {
        default_severity()
    } else {
        quiet_paths(config.quiet_paths.clone(), config.quiet_level)
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    if let Err(e) = result {
        tracing::warn!(error = %e, "Logging already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_paths_lower_only_listed_paths() {
        let policy = quiet_paths(vec!["/health".into()], LogLevel::Debug);
        assert_eq!(policy("/health"), LogLevel::Debug);
        assert_eq!(policy("/health/deep"), LogLevel::Info);
        assert_eq!(policy("/users"), LogLevel::Info);
    }

    #[test]
    fn promotion_never_lowers_severity() {
        assert_eq!(LogEntry::new(LogLevel::Trace, "x").promoted().level, LogLevel::Info);
        assert_eq!(LogEntry::new(LogLevel::Error, "x").promoted().level, LogLevel::Error);
    }

    #[test]
    fn config_without_quiet_paths_uses_default() {
        let config = ObservabilityConfig {
            quiet_paths: Vec::new(),
            ..ObservabilityConfig::default()
        };
        assert_eq!(severity_from_config(&config)("/health"), LogLevel::Info);
    }
}
