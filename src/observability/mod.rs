//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline stages produce:
//!     → logging.rs (access-log entries, severity policy, subscriber setup)
//!     → completion.rs (per-request outcome → log echo + metric records)
//!     → metrics.rs (tokens, sinks, Prometheus exporter)
//! ```
//!
//! # Design Decisions
//! - Transaction ID flows explicitly through every stage
//! - Emission never fails a request; sink errors are logged and dropped
//! - Metrics and their log echo are switched independently

pub mod completion;
pub mod logging;
pub mod metrics;
