//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured port
//!     → listener.rs (wildcard bind, fail fast on conflicts)
//!     → tls.rs (optional rustls context from PEM files)
//!     → Hand off to the lifecycle, which serves the pipeline on it
//! ```
//!
//! # Design Decisions
//! - Binding happens synchronously so a port conflict is reported at startup
//! - TLS is optional and built outside the lifecycle

pub mod listener;
pub mod tls;

pub use listener::{bind_wildcard, ListenerError};
