//! Completion logging and metrics emission.
//!
//! Runs once per request with its final outcome. Only completed responses are
//! measured. Metrics flow to the sink whenever metrics are enabled; the textual
//! echo of the token is a separate, optional log line.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;

use crate::http::request::RequestLine;
use crate::http::transaction::TransactionContext;
use crate::observability::logging::{LogEntry, LogLevel, SeverityPolicy};
use crate::observability::metrics::{MetricRecord, MetricSink, MetricToken, Observation};

/// Final outcome of a request as seen by the telemetry stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A fully materialized response was produced.
    Completed { status: StatusCode },
    /// The pipeline failed the request.
    Failed { reason: String },
    /// The request future was dropped before an outcome was known.
    Cancelled,
}

/// Settings for the completion stage.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    /// Component name echoed in completion lines.
    pub component: String,
    pub metrics_enabled: bool,
    pub metrics_as_logs: bool,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            component: "request-pipeline".to_string(),
            metrics_enabled: true,
            metrics_as_logs: false,
        }
    }
}

/// What the completion stage measured for one completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub token: MetricToken,
    pub elapsed: Duration,
    /// The echo line, present only when metrics are logged.
    pub log: Option<LogEntry>,
}

/// Emits the completion log line and metric records.
#[derive(Clone)]
pub struct ResponseEmitter {
    settings: CompletionSettings,
    severity: SeverityPolicy,
    sink: Arc<dyn MetricSink>,
}

impl ResponseEmitter {
    pub fn new(settings: CompletionSettings, severity: SeverityPolicy, sink: Arc<dyn MetricSink>) -> Self {
        Self {
            settings,
            severity,
            sink,
        }
    }

    /// Arm a guard that reports `Cancelled` if the request is dropped.
    pub fn guard<'a>(&'a self, ctx: &'a TransactionContext, line: &'a RequestLine) -> CompletionGuard<'a> {
        CompletionGuard {
            emitter: self,
            ctx,
            line,
            armed: true,
        }
    }

    /// Report the final outcome. Returns the measurement for completed responses.
    pub fn observe(
        &self,
        ctx: &TransactionContext,
        line: &RequestLine,
        outcome: &Outcome,
    ) -> Option<CompletionRecord> {
        let status = match outcome {
            Outcome::Completed { status } => *status,
            Outcome::Failed { reason } => {
                tracing::warn!(txid = %ctx.id(), path = %line.path, reason = %reason, "Request failed; not measured");
                return None;
            }
            Outcome::Cancelled => {
                tracing::debug!(txid = %ctx.id(), path = %line.path, "Request cancelled; not measured");
                return None;
            }
        };

        let elapsed = ctx.elapsed();
        let token = MetricToken::http(&line.method, status);

        if self.settings.metrics_enabled {
            self.emit_metrics(&token, elapsed);
        }

        let log = self.settings.metrics_as_logs.then(|| {
            let entry = self.entry(ctx, line, &token, elapsed);
            entry.emit();
            entry
        });

        Some(CompletionRecord {
            token,
            elapsed,
            log,
        })
    }

    fn emit_metrics(&self, token: &MetricToken, elapsed: Duration) {
        for observation in [Observation::Duration(elapsed), Observation::Increment] {
            let record = MetricRecord {
                token: token.clone(),
                observation,
            };
            if let Err(e) = self.sink.emit(&record) {
                tracing::warn!(error = %e, "Dropping metric record");
            }
        }
    }

    fn entry(
        &self,
        ctx: &TransactionContext,
        line: &RequestLine,
        token: &MetricToken,
        elapsed: Duration,
    ) -> LogEntry {
        let level: LogLevel = (self.severity)(&line.path);
        let entry = LogEntry::new(
            level,
            format!(
                "[{}] [{}] {} {}ms",
                ctx.id(),
                self.settings.component,
                token,
                elapsed.as_millis()
            ),
        );
        if ctx.extra_logging() {
            entry.promoted()
        } else {
            entry
        }
    }
}

/// Reports `Cancelled` on drop unless [`finish`](Self::finish) ran first.
pub struct CompletionGuard<'a> {
    emitter: &'a ResponseEmitter,
    ctx: &'a TransactionContext,
    line: &'a RequestLine,
    armed: bool,
}

impl CompletionGuard<'_> {
    pub fn finish(mut self, outcome: Outcome) -> Option<CompletionRecord> {
        self.armed = false;
        self.emitter.observe(self.ctx, self.line, &outcome)
    }
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.emitter.observe(self.ctx, self.line, &Outcome::Cancelled);
        }
    }
}
