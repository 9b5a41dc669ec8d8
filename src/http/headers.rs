//! Header scrubbing.
//!
//! Internal-only headers are removed after the transaction context has been
//! derived from them and before the wrapped handler runs.

use axum::http::HeaderMap;

use crate::http::transaction::EXTRA_LOGGING_HEADER;

/// Headers that must never reach handler logic.
pub const INTERNAL_HEADERS: &[&str] = &[EXTRA_LOGGING_HEADER];

/// Remove every occurrence of each internal header. No-op when absent.
pub fn scrub_internal(headers: &mut HeaderMap) {
    for name in INTERNAL_HEADERS {
        // `remove` drops all values stored under the name.
        if headers.remove(*name).is_some() {
            tracing::trace!(header = *name, "Scrubbed internal header");
        }
    }
}
