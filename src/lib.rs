//! Request instrumentation pipeline library.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::PipelineConfig;
pub use error::PipelineError;
pub use http::{Pipeline, TransactionContext};
pub use lifecycle::ServiceLifecycle;
pub use routing::{Rejection, RejectionSet, Route, Router};
