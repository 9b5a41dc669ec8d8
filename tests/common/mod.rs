//! Shared utilities for integration tests.

use std::sync::Arc;
use std::time::Duration;

use request_pipeline::lifecycle::LifecycleSettings;
use request_pipeline::observability::metrics::InMemorySink;
use request_pipeline::{Pipeline, Route, Router, ServiceLifecycle};

/// A lifecycle serving `router` on an ephemeral port, measured into `sink`.
pub struct TestService {
    pub lifecycle: ServiceLifecycle,
    pub sink: Arc<InMemorySink>,
}

impl TestService {
    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.lifecycle.local_addr().port(), path)
    }
}

/// Short budgets so shutdown tests finish quickly.
pub fn fast_settings() -> LifecycleSettings {
    LifecycleSettings {
        drain: Duration::from_secs(2),
        terminate: Duration::from_secs(2),
    }
}

pub fn start(router: Router) -> TestService {
    start_with(router, fast_settings())
}

/// Like [`start`], with explicit shutdown budgets.
#[allow(dead_code)]
pub fn start_with(router: Router, settings: LifecycleSettings) -> TestService {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = Pipeline::builder(router)
        .metric_sink(sink.clone())
        .entity_timeout(Duration::from_millis(500))
        .build();
    let lifecycle = ServiceLifecycle::bind(0, None, pipeline.into_router(), settings).unwrap();
    TestService { lifecycle, sink }
}

/// Routes mirroring the host binary plus a few with extra conditions.
#[allow(dead_code)]
pub fn demo_router() -> Router {
    Router::new()
        .route(Route::get("/health").to(|_req| async { "OK" }))
        .route(
            Route::get("/report")
                .produces("application/json")
                .require_query("from")
                .to(|_req| async { "{}" }),
        )
        .route(Route::post("/orders").consumes("application/json").to(|_req| async { "created" }))
}

/// A client that does not reuse connections across tests.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}
