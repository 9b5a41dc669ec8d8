//! Pipeline composition.
//!
//! # Request Flow
//! ```text
//! inbound request
//!     → TransactionContext::from_headers   (identity, extra-logging flag)
//!     → RequestLogger                      ([txid] METHOD path query)
//!     → scrub_internal                     (reserved headers removed)
//!     → RouteHandler::call                 (wrapped route logic)
//!     → arbitrate + respond                (only on rejection)
//!     → materialize                        (bounded body buffering)
//!     → ResponseEmitter                    (metrics + optional echo line)
//! ```
//!
//! The order is fixed. Each stage gets the transaction context by reference.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::response::Response;
use tracing::Instrument;

use crate::config::schema::PipelineConfig;
use crate::http::handler::{BoxedRouteHandler, RouteHandler, RouteOutcome};
use crate::http::headers::scrub_internal;
use crate::http::request::{RequestLine, RequestLogger};
use crate::http::response::materialize;
use crate::http::transaction::TransactionContext;
use crate::observability::completion::{CompletionSettings, Outcome, ResponseEmitter};
use crate::observability::logging::{default_severity, severity_from_config, SeverityPolicy};
use crate::observability::metrics::{MetricSink, RecorderSink};
use crate::routing::rejection::{arbitrate, respond};

/// Response header echoing the transaction id to the client.
pub const TRANSACTION_ID_HEADER: &str = "x-transaction-id";

/// Instrumentation pipeline around a [`RouteHandler`].
pub struct Pipeline {
    handler: BoxedRouteHandler,
    request_logger: RequestLogger,
    emitter: ResponseEmitter,
    entity_timeout: Duration,
}

impl Pipeline {
    pub fn builder(handler: impl RouteHandler) -> PipelineBuilder {
        PipelineBuilder {
            handler: Arc::new(handler),
            severity: default_severity(),
            sink: Arc::new(RecorderSink),
            settings: CompletionSettings::default(),
            entity_timeout: Duration::from_secs(30),
        }
    }

    /// Build a pipeline with settings taken from `config`.
    pub fn from_config(
        config: &PipelineConfig,
        handler: impl RouteHandler,
        sink: Arc<dyn MetricSink>,
    ) -> Self {
        let observability = &config.observability;
        Self::builder(handler)
            .severity(severity_from_config(observability))
            .metric_sink(sink)
            .completion(CompletionSettings {
                component: observability.service_name.clone(),
                metrics_enabled: observability.metrics_enabled,
                metrics_as_logs: observability.metrics_as_logs,
            })
            .entity_timeout(config.timeouts.entity())
            .build()
    }

    /// Run one request through every stage.
    pub async fn handle(&self, req: Request<Body>) -> Response {
        let ctx = TransactionContext::from_headers(req.headers());
        let span = tracing::info_span!(
            "txn",
            txid = %ctx.id(),
            extra_logging = ctx.extra_logging()
        );
        self.run(ctx, req).instrument(span).await
    }

    async fn run(&self, ctx: TransactionContext, mut req: Request<Body>) -> Response {
        let line = RequestLine::of(&req);
        self.request_logger.log(&ctx, &line);

        scrub_internal(req.headers_mut());
        req.extensions_mut().insert(ctx.clone());

        let guard = self.emitter.guard(&ctx, &line);

        let response = match self.handler.call(req).await {
            RouteOutcome::Complete(response) => response,
            RouteOutcome::Rejected(rejections) => respond(&ctx, &arbitrate(rejections)),
        };

        let mut response = match materialize(response, self.entity_timeout).await {
            Ok(response) => {
                guard.finish(Outcome::Completed {
                    status: response.status(),
                });
                response
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %line.path, "Response entity not materialized");
                guard.finish(Outcome::Failed {
                    reason: e.to_string(),
                });
                e.to_response(&ctx)
            }
        };

        if let Ok(value) = HeaderValue::from_str(&ctx.id().to_string()) {
            response.headers_mut().insert(TRANSACTION_ID_HEADER, value);
        }
        response
    }

    /// Serve every path and method through this pipeline.
    pub fn into_router(self) -> axum::Router {
        let pipeline = Arc::new(self);
        axum::Router::new().fallback(move |req: Request<Body>| {
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.handle(req).await }
        })
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    handler: BoxedRouteHandler,
    severity: SeverityPolicy,
    sink: Arc<dyn MetricSink>,
    settings: CompletionSettings,
    entity_timeout: Duration,
}

impl PipelineBuilder {
    /// Per-path severity for access-log entries.
    pub fn severity(mut self, severity: SeverityPolicy) -> Self {
        self.severity = severity;
        self
    }

    pub fn metric_sink(mut self, sink: Arc<dyn MetricSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn completion(mut self, settings: CompletionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Budget for buffering response bodies.
    pub fn entity_timeout(mut self, timeout: Duration) -> Self {
        self.entity_timeout = timeout;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            handler: self.handler,
            request_logger: RequestLogger::new(self.severity.clone()),
            emitter: ResponseEmitter::new(self.settings, self.severity, self.sink),
            entity_timeout: self.entity_timeout,
        }
    }
}
