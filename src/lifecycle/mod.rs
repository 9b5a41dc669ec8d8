//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Bind 0.0.0.0:port → spawn the serving task on the substrate
//!
//! Shutdown (shutdown.rs):
//!     One-shot hook → unbind + drain → terminate substrate → await tasks
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → run the shutdown hook
//! ```
//!
//! # Design Decisions
//! - Bind failure is the only fatal error
//! - Every shutdown step is bounded; a timeout is logged and the sequence moves on
//! - Repeated shutdown requests are no-ops

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownReport, StepOutcome};
pub use startup::{LifecycleError, LifecycleSettings, ServiceLifecycle};
