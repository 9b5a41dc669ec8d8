//! Per-request transaction identity.
//!
//! A [`TransactionContext`] is allocated before anything else runs for a
//! request and is passed by reference to every later stage. Handlers can read
//! a copy from the request extensions.

use std::fmt;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use uuid::Uuid;

/// Reserved header that switches on extra logging for one transaction.
///
/// Stripped before the wrapped handler runs.
pub const EXTRA_LOGGING_HEADER: &str = "x-txn-extra-logging";

/// Opaque unique identifier for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Identity and timing for one request. Immutable after creation.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    id: TransactionId,
    start: Instant,
    extra_logging: bool,
}

impl TransactionContext {
    /// Allocate a context for an inbound request.
    ///
    /// Extra logging is on only when the reserved header reads `on`,
    /// ignoring ASCII case. Anything else, including non-UTF-8 values, is off.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let extra_logging = headers
            .get(EXTRA_LOGGING_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("on"));

        Self {
            id: TransactionId::generate(),
            start: Instant::now(),
            extra_logging,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn extra_logging(&self) -> bool {
        self.extra_logging
    }

    /// Time since the context was allocated.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
