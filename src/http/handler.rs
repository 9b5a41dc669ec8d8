//! The wrapped-handler contract.
//!
//! The pipeline is polymorphic over anything implementing [`RouteHandler`]:
//! a [`Router`](crate::routing::Router), or any async function wrapped with
//! [`handler_fn`].

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::routing::rejection::{Rejection, RejectionSet};

/// What route logic produced for a request.
#[derive(Debug)]
pub enum RouteOutcome {
    /// A response, possibly with a body still streaming.
    Complete(Response),
    /// No route accepted the request.
    Rejected(RejectionSet),
}

impl From<Response> for RouteOutcome {
    fn from(response: Response) -> Self {
        Self::Complete(response)
    }
}

impl From<RejectionSet> for RouteOutcome {
    fn from(set: RejectionSet) -> Self {
        Self::Rejected(set)
    }
}

impl From<Rejection> for RouteOutcome {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(RejectionSet::single(rejection))
    }
}

/// Route logic wrapped by the pipeline.
pub trait RouteHandler: Send + Sync + 'static {
    fn call(&self, req: Request<Body>) -> BoxFuture<'static, RouteOutcome>;
}

/// Shared, type-erased handler.
pub type BoxedRouteHandler = Arc<dyn RouteHandler>;

/// Adapter returned by [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F>(F);

/// Wrap an async function as a [`RouteHandler`].
pub fn handler_fn<F, Fut, O>(f: F) -> HandlerFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    O: Into<RouteOutcome>,
{
    HandlerFn(f)
}

impl<F, Fut, O> RouteHandler for HandlerFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    O: Into<RouteOutcome>,
{
    fn call(&self, req: Request<Body>) -> BoxFuture<'static, RouteOutcome> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into() })
    }
}
