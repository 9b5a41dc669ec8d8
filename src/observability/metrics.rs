//! Metric records and sinks.
//!
//! # Metrics
//! Every completed request produces two records sharing one [`MetricToken`]:
//! - an `Increment` (exported as `http_count`)
//! - a `Duration` sample (exported as `http_count_duration_seconds`)
//!
//! # Design Decisions
//! - Sinks are `Send + Sync` and shared by every request
//! - Sink failures are reported, never propagated into request handling
//! - Label keys follow the token: `method`, `statusCode`

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use dashmap::DashMap;
use metrics::Label;
use metrics_exporter_prometheus::PrometheusBuilder;
use thiserror::Error;

pub const PROTOCOL_HTTP: &str = "http";
pub const METRIC_COUNT: &str = "count";
pub const TAG_STATUS_CODE: &str = "statusCode";

/// Identifies what a metric observation is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricToken {
    pub protocol: String,
    pub operation: String,
    pub name: String,
    pub outcome: String,
    pub tags: BTreeMap<String, String>,
}

impl MetricToken {
    /// Token for a completed HTTP request.
    pub fn http(method: &Method, status: StatusCode) -> Self {
        let status = status.as_u16().to_string();
        Self {
            protocol: PROTOCOL_HTTP.to_string(),
            operation: method.as_str().to_ascii_lowercase(),
            name: METRIC_COUNT.to_string(),
            outcome: status.clone(),
            tags: BTreeMap::from([(TAG_STATUS_CODE.to_string(), status)]),
        }
    }

    /// Exported metric name, e.g. `http_count`.
    pub fn metric_name(&self) -> String {
        format!("{}_{}", self.protocol, self.name)
    }

    fn labels(&self) -> Vec<Label> {
        let mut labels = vec![Label::new("method", self.operation.clone())];
        labels.extend(
            self.tags
                .iter()
                .map(|(k, v)| Label::new(k.clone(), v.clone())),
        );
        labels
    }
}

impl fmt::Display for MetricToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.protocol, self.operation, self.name, self.outcome
        )?;
        let tags: Vec<String> = self.tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", tags.join(","))
    }
}

/// Kind of observation carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Counter increment by one.
    Increment,
    /// Histogram sample.
    Duration(Duration),
}

/// One metric observation bound to its token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRecord {
    pub token: MetricToken,
    pub observation: Observation,
}

/// Failure reported by a metric sink.
#[derive(Debug, Error)]
#[error("metric sink rejected `{token}`: {reason}")]
pub struct SinkError {
    pub token: MetricToken,
    pub reason: String,
}

/// Destination for metric records. Must tolerate concurrent emission.
pub trait MetricSink: Send + Sync {
    fn emit(&self, record: &MetricRecord) -> Result<(), SinkError>;
}

/// Forwards records to the global `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderSink;

impl MetricSink for RecorderSink {
    fn emit(&self, record: &MetricRecord) -> Result<(), SinkError> {
        let token = &record.token;
        let name = token.metric_name();
        match record.observation {
            Observation::Increment => {
                metrics::counter!(name, token.labels()).increment(1);
            }
            Observation::Duration(elapsed) => {
                metrics::histogram!(format!("{name}_duration_seconds"), token.labels())
                    .record(elapsed.as_secs_f64());
            }
        }
        Ok(())
    }
}

/// Aggregated observations for one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricAggregate {
    pub count: u64,
    pub samples: Vec<Duration>,
}

/// Thread-safe in-process aggregator.
#[derive(Debug, Default)]
pub struct InMemorySink {
    entries: DashMap<MetricToken, MetricAggregate>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter value for `token`.
    pub fn count(&self, token: &MetricToken) -> u64 {
        self.entries.get(token).map(|e| e.count).unwrap_or(0)
    }

    /// Histogram samples recorded for `token`.
    pub fn samples(&self, token: &MetricToken) -> Vec<Duration> {
        self.entries
            .get(token)
            .map(|e| e.samples.clone())
            .unwrap_or_default()
    }

    /// Copy of every aggregate, ordered by token.
    pub fn snapshot(&self) -> Vec<(MetricToken, MetricAggregate)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetricSink for InMemorySink {
    fn emit(&self, record: &MetricRecord) -> Result<(), SinkError> {
        let mut entry = self.entries.entry(record.token.clone()).or_default();
        match record.observation {
            Observation::Increment => entry.count += 1,
            Observation::Duration(elapsed) => entry.samples.push(elapsed),
        }
        Ok(())
    }
}

/// Install the Prometheus exporter as the global recorder.
pub fn install_exporter(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_token_shape() {
        let token = MetricToken::http(&Method::GET, StatusCode::OK);
        assert_eq!(token.protocol, "http");
        assert_eq!(token.operation, "get");
        assert_eq!(token.name, "count");
        assert_eq!(token.outcome, "200");
        assert_eq!(token.tags.get("statusCode").map(String::as_str), Some("200"));
        assert_eq!(token.tags.len(), 1);
        assert_eq!(token.to_string(), "http.get.count.200{statusCode=200}");
        assert_eq!(token.metric_name(), "http_count");
    }

    #[test]
    fn in_memory_sink_aggregates_per_token() {
        let sink = InMemorySink::new();
        let ok = MetricToken::http(&Method::POST, StatusCode::CREATED);
        let missing = MetricToken::http(&Method::POST, StatusCode::NOT_FOUND);

        for observation in [
            Observation::Increment,
            Observation::Duration(Duration::from_millis(3)),
            Observation::Increment,
        ] {
            sink.emit(&MetricRecord {
                token: ok.clone(),
                observation,
            })
            .unwrap();
        }

        assert_eq!(sink.count(&ok), 2);
        assert_eq!(sink.samples(&ok), vec![Duration::from_millis(3)]);
        assert_eq!(sink.count(&missing), 0);
        assert_eq!(sink.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn in_memory_sink_accepts_concurrent_emission() {
        let sink = std::sync::Arc::new(InMemorySink::new());
        let token = MetricToken::http(&Method::GET, StatusCode::OK);

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let sink = sink.clone();
            let token = token.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..100 {
                    sink.emit(&MetricRecord {
                        token: token.clone(),
                        observation: Observation::Increment,
                    })
                    .unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(sink.count(&token), 1600);
    }
}
