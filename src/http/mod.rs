//! HTTP instrumentation subsystem.
//!
//! # Data Flow
//! ```text
//! Request from the listener
//!     → transaction.rs (transaction id, extra-logging flag)
//!     → request.rs (access-log entry)
//!     → headers.rs (strip reserved headers)
//!     → handler.rs (wrapped route logic)
//!     → response.rs (buffer the entity within budget)
//!     → server.rs (composes the above, hands off to completion telemetry)
//! ```
//!
//! # Design Decisions
//! - Each request gets exactly one transaction context
//! - Reserved headers never reach route logic
//! - Failed or cancelled requests are logged but not measured

pub mod handler;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;
pub mod transaction;

pub use handler::{handler_fn, RouteHandler, RouteOutcome};
pub use server::{Pipeline, PipelineBuilder, TRANSACTION_ID_HEADER};
pub use transaction::{TransactionContext, TransactionId, EXTRA_LOGGING_HEADER};
