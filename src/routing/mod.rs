//! Route matching subsystem.
//!
//! # Data Flow
//! ```text
//! Request (headers scrubbed)
//!     → router.rs (try routes in order)
//!     → matcher.rs (path, method, negotiation, required params)
//!     → endpoint response, or RejectionSet
//!     → rejection.rs (arbitrate + default responder, driven by the pipeline)
//! ```
//!
//! # Design Decisions
//! - One rejection per candidate route whose path matched
//! - Unknown paths yield an empty set, rendered as 404
//! - Content-negotiation failures are surfaced ahead of everything else

pub mod matcher;
pub mod rejection;
pub mod router;

pub use rejection::{arbitrate, Rejection, RejectionSet};
pub use router::{Route, RouteBuilder, Router};
