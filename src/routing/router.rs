//! Ordered route table.
//!
//! Routes are tried in registration order. The first route whose path and
//! conditions all match handles the request. Every route whose path matched
//! but whose conditions failed contributes one rejection.

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;

use crate::http::handler::{RouteHandler, RouteOutcome};
use crate::routing::matcher::{
    ConsumesMatcher, HeaderMatcher, Matcher, MethodMatcher, PathPattern, ProducesMatcher,
    QueryParamMatcher,
};
use crate::routing::rejection::RejectionSet;

type Endpoint = Arc<dyn Fn(Request<Body>) -> BoxFuture<'static, Response> + Send + Sync>;

/// A route definition before its endpoint is attached.
#[derive(Debug)]
pub struct RouteBuilder {
    path: PathPattern,
    method: Method,
    consumes: Vec<String>,
    produces: Vec<String>,
    matchers: Vec<Box<dyn Matcher>>,
}

impl RouteBuilder {
    /// Media type the route accepts as request entity. Repeatable.
    pub fn consumes(mut self, media_type: impl Into<String>) -> Self {
        self.consumes.push(media_type.into());
        self
    }

    /// Media type the route responds with. Repeatable.
    pub fn produces(mut self, media_type: impl Into<String>) -> Self {
        self.produces.push(media_type.into());
        self
    }

    pub fn require_query(mut self, name: impl Into<String>) -> Self {
        self.matchers.push(Box::new(QueryParamMatcher::new(name)));
        self
    }

    pub fn require_header(mut self, name: impl Into<String>) -> Self {
        self.matchers.push(Box::new(HeaderMatcher::new(name)));
        self
    }

    /// Attach the endpoint and finish the route.
    pub fn to<F, Fut, R>(self, handler: F) -> Route
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        let mut matchers: Vec<Box<dyn Matcher>> = vec![Box::new(MethodMatcher::new(self.method))];
        if !self.consumes.is_empty() {
            matchers.push(Box::new(ConsumesMatcher::new(self.consumes)));
        }
        if !self.produces.is_empty() {
            matchers.push(Box::new(ProducesMatcher::new(self.produces)));
        }
        matchers.extend(self.matchers);

        let endpoint: Endpoint = Arc::new(move |req: Request<Body>| -> BoxFuture<'static, Response> {
            let fut = handler(req);
            Box::pin(async move { fut.await.into_response() })
        });

        Route {
            path: self.path,
            matchers,
            endpoint,
        }
    }
}

/// A path, its conditions and the endpoint they guard.
pub struct Route {
    path: PathPattern,
    matchers: Vec<Box<dyn Matcher>>,
    endpoint: Endpoint,
}

impl Route {
    pub fn new(method: Method, path: &str) -> RouteBuilder {
        RouteBuilder {
            path: PathPattern::parse(path),
            method,
            consumes: Vec::new(),
            produces: Vec::new(),
            matchers: Vec::new(),
        }
    }

    pub fn get(path: &str) -> RouteBuilder {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> RouteBuilder {
        Self::new(Method::POST, path)
    }

    pub fn put(path: &str) -> RouteBuilder {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: &str) -> RouteBuilder {
        Self::new(Method::DELETE, path)
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("matchers", &self.matchers)
            .finish_non_exhaustive()
    }
}

/// The route table handed to the pipeline.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. Earlier routes take precedence.
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the endpoint for `req`, or the rejections explaining why none fits.
    fn select(&self, req: &Request<Body>) -> Result<&Endpoint, RejectionSet> {
        let mut rejections = RejectionSet::new();
        let path = req.uri().path();

        for route in self.routes.iter().filter(|r| r.path.matches(path)) {
            match route.matchers.iter().try_for_each(|m| m.check(req)) {
                Ok(()) => return Ok(&route.endpoint),
                Err(rejection) => rejections.push(rejection),
            }
        }
        Err(rejections)
    }
}

impl RouteHandler for Router {
    fn call(&self, req: Request<Body>) -> BoxFuture<'static, RouteOutcome> {
        match self.select(&req) {
            Ok(endpoint) => {
                let fut = (**endpoint)(req);
                Box::pin(async move { RouteOutcome::Complete(fut.await) })
            }
            Err(rejections) => {
                tracing::debug!(rejections = rejections.len(), "No route accepted request");
                Box::pin(async move { RouteOutcome::Rejected(rejections) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::rejection::Rejection;
    use axum::http::StatusCode;

    fn router() -> Router {
        Router::new()
            .route(Route::get("/users").produces("application/json").to(|_req| async { "list" }))
            .route(
                Route::post("/users")
                    .consumes("application/json")
                    .to(|_req| async { StatusCode::CREATED }),
            )
            .route(Route::get("/files/*").to(|_req| async { "file" }))
    }

    async fn outcome(method: Method, uri: &str, headers: &[(&str, &str)]) -> RouteOutcome {
        let mut builder = Request::builder().method(method).uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        router().call(builder.body(Body::empty()).unwrap()).await
    }

    #[tokio::test]
    async fn first_matching_route_handles() {
        match outcome(Method::POST, "/users", &[("content-type", "application/json")]).await {
            RouteOutcome::Complete(r) => assert_eq!(r.status(), StatusCode::CREATED),
            other => panic!("unexpected {other:?}"),
        }
        match outcome(Method::GET, "/files/a.txt", &[]).await {
            RouteOutcome::Complete(r) => assert_eq!(r.status(), StatusCode::OK),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_path_yields_empty_rejections() {
        match outcome(Method::GET, "/nowhere", &[]).await {
            RouteOutcome::Rejected(set) => assert!(set.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn each_candidate_contributes_one_rejection() {
        match outcome(Method::GET, "/users", &[("accept", "text/csv")]).await {
            RouteOutcome::Rejected(set) => assert_eq!(
                set,
                RejectionSet::from(vec![
                    Rejection::UnacceptedResponseContentType {
                        supported: vec!["application/json".into()]
                    },
                    Rejection::MethodNotAllowed { supported: Method::POST },
                ])
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn required_query_parameter() {
        let router = Router::new()
            .route(Route::get("/search").require_query("q").to(|_req| async { "hits" }));
        let req = Request::get("/search?page=1").body(Body::empty()).unwrap();
        match router.call(req).await {
            RouteOutcome::Rejected(set) => assert_eq!(
                set,
                RejectionSet::single(Rejection::MissingQueryParam { name: "q".into() })
            ),
            other => panic!("unexpected {other:?}"),
        }
    }
}
