//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::observability::logging::LogLevel;

/// Root configuration for the pipeline host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Listener configuration (port, TLS).
    pub listener: ListenerConfig,

    /// Timeout budgets for entity buffering and shutdown.
    pub timeouts: TimeoutConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
///
/// The bind host is always the wildcard address; only the port is configurable.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Port to bind on `0.0.0.0`.
    pub port: u16,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration, in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for fully buffering a response entity.
    pub entity_secs: u64,

    /// Budget for draining in-flight connections after unbind.
    pub drain_secs: u64,

    /// Budget for background tasks to finish after termination.
    pub terminate_secs: u64,
}

impl TimeoutConfig {
    pub fn entity(&self) -> Duration {
        Duration::from_secs(self.entity_secs)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_secs(self.drain_secs)
    }

    pub fn terminate(&self) -> Duration {
        Duration::from_secs(self.terminate_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            entity_secs: 30,
            drain_secs: 30,
            terminate_secs: 30,
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Component name echoed in completion log lines.
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error) used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Subscriber output format.
    pub log_format: LogFormat,

    /// Emit metric records to the metric sink.
    pub metrics_enabled: bool,

    /// Echo each completed request's metric token as a log line.
    pub metrics_as_logs: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,

    /// Paths whose access-log entries are emitted at `quiet_level`.
    pub quiet_paths: Vec<String>,

    /// Severity used for `quiet_paths`.
    pub quiet_level: LogLevel,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "request-pipeline".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_as_logs: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            quiet_paths: vec!["/health".to_string(), "/ready".to_string()],
            quiet_level: LogLevel::Debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_thirty_second_budgets() {
        let config = PipelineConfig::default();
        assert_eq!(config.timeouts.entity(), Duration::from_secs(30));
        assert_eq!(config.timeouts.drain(), Duration::from_secs(30));
        assert_eq!(config.timeouts.terminate(), Duration::from_secs(30));
        assert!(config.observability.metrics_enabled);
        assert!(!config.observability.metrics_as_logs);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [listener]
            port = 9000

            [observability]
            metrics_as_logs = true
            log_format = "json"
            quiet_level = "trace"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.port, 9000);
        assert!(config.listener.tls.is_none());
        assert!(config.observability.metrics_as_logs);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.quiet_level, LogLevel::Trace);
        assert_eq!(config.timeouts.entity_secs, 30);
    }
}
