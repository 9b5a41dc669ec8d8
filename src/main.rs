//! request-pipeline host binary.
//!
//! Loads configuration, installs logging and metrics, wraps a small set of
//! operational routes in the instrumentation pipeline, and serves them until
//! SIGTERM or Ctrl-C.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::header;
use axum::response::IntoResponse;
use clap::Parser;

use request_pipeline::config::loader::load_config;
use request_pipeline::lifecycle::{LifecycleSettings, ServiceLifecycle, ShutdownReport};
use request_pipeline::net::tls::load_tls_config;
use request_pipeline::observability::{logging, metrics};
use request_pipeline::{Pipeline, PipelineConfig, Route, Router};

#[derive(Parser, Debug)]
#[command(name = "request-pipeline", version, about = "Instrumented HTTP service host")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configuration
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "request-pipeline starting");
    tracing::info!(
        port = config.listener.port,
        tls = config.listener.tls.is_some(),
        entity_timeout_secs = config.timeouts.entity_secs,
        metrics_enabled = config.observability.metrics_enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::install_exporter(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let tls = match &config.listener.tls {
        Some(tls) => Some(load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?),
        None => None,
    };

    let pipeline = Pipeline::from_config(&config, routes(&config), Arc::new(metrics::RecorderSink));
    let lifecycle = ServiceLifecycle::bind(
        config.listener.port,
        tls,
        pipeline.into_router(),
        LifecycleSettings::from(&config.timeouts),
    )?;

    tracing::info!(address = %lifecycle.local_addr(), "Listening for connections");

    match lifecycle.run_until_signal().await {
        ShutdownReport::Executed { .. } => tracing::info!("Shutdown complete"),
        ShutdownReport::AlreadyTriggered => tracing::debug!("Shutdown ran elsewhere"),
    }
    Ok(())
}

fn routes(config: &PipelineConfig) -> Router {
    let service = config.observability.service_name.clone();

    Router::new()
        .route(Route::get("/health").to(|_req| async { "OK" }))
        .route(Route::get("/ready").to(|_req| async { "READY" }))
        .route(Route::get("/version").produces("application/json").to(move |_req| {
            let body = serde_json::json!({
                "service": service,
                "version": env!("CARGO_PKG_VERSION"),
            });
            async move { ([(header::CONTENT_TYPE, "application/json")], body.to_string()).into_response() }
        }))
}
