//! Request-entry logging.
//!
//! # Responsibilities
//! - Capture method, path and query before the request moves into the handler
//! - Format the `[txid] METHOD path query` access line
//! - Pick the severity through the host's per-path policy

use axum::http::{Method, Request};

use crate::http::transaction::TransactionContext;
use crate::observability::logging::{LogEntry, SeverityPolicy};

/// Method, path and raw query of a request, captured at entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
}

impl RequestLine {
    pub fn of<B>(req: &Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(str::to_string),
        }
    }
}

/// Logs one line per inbound request.
#[derive(Clone)]
pub struct RequestLogger {
    severity: SeverityPolicy,
}

impl RequestLogger {
    pub fn new(severity: SeverityPolicy) -> Self {
        Self { severity }
    }

    /// Build the entry for `line` without emitting it.
    pub fn entry(&self, ctx: &TransactionContext, line: &RequestLine) -> LogEntry {
        let mut message = format!("[{}] {} {}", ctx.id(), line.method, line.path);
        if let Some(query) = line.query.as_deref().filter(|q| !q.is_empty()) {
            message.push(' ');
            message.push_str(query);
        }

        let entry = LogEntry::new((self.severity)(&line.path), message);
        if ctx.extra_logging() {
            entry.promoted()
        } else {
            entry
        }
    }

    pub fn log(&self, ctx: &TransactionContext, line: &RequestLine) {
        self.entry(ctx, line).emit();
    }
}
