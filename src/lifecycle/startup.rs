//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the wildcard listener on the configured port
//! - Serve the application over plain TCP or TLS
//! - Run the serving task on the shutdown substrate
//!
//! # Design Decisions
//! - Fail fast: a bind error is returned before anything is spawned
//! - The listener handle is stored once and taken once by the shutdown hook

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Mutex;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use thiserror::Error;

use crate::config::schema::TimeoutConfig;
use crate::lifecycle::shutdown::{Shutdown, ShutdownReport};
use crate::lifecycle::signals;
use crate::net::listener::{bind_wildcard, ListenerError};

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Bind(#[from] ListenerError),
}

/// Budgets for the bounded shutdown steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// How long in-flight connections may drain after unbinding.
    pub drain: Duration,
    /// How long spawned tasks may take to finish after termination.
    pub terminate: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

impl From<&TimeoutConfig> for LifecycleSettings {
    fn from(timeouts: &TimeoutConfig) -> Self {
        Self {
            drain: timeouts.drain(),
            terminate: timeouts.terminate(),
        }
    }
}

/// The bound listener, released by the shutdown hook.
pub(crate) struct ServiceBinding {
    pub(crate) handle: Handle,
    pub(crate) local_addr: SocketAddr,
}

/// A bound, serving service and its shutdown hook.
pub struct ServiceLifecycle {
    pub(crate) binding: Mutex<Option<ServiceBinding>>,
    pub(crate) substrate: Shutdown,
    pub(crate) triggered: AtomicBool,
    pub(crate) settings: LifecycleSettings,
    local_addr: SocketAddr,
}

impl ServiceLifecycle {
    /// Bind `0.0.0.0:port` and start serving `app`.
    ///
    /// Serves over TLS when `tls` is given. Must be called from within a
    /// Tokio runtime.
    pub fn bind(
        port: u16,
        tls: Option<RustlsConfig>,
        app: axum::Router,
        settings: LifecycleSettings,
    ) -> Result<Self, LifecycleError> {
        let listener = bind_wildcard(port)?;
        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
            source,
        })?;

        let tls_enabled = tls.is_some();
        let handle = Handle::new();
        let substrate = Shutdown::new();
        let service = app.into_make_service();

        match tls {
            Some(tls) => {
                let server = axum_server::from_tcp_rustls(listener, tls).handle(handle.clone());
                substrate.spawn("https", async move {
                    if let Err(e) = server.serve(service).await {
                        tracing::error!(error = %e, "HTTPS server stopped");
                    }
                });
            }
            None => {
                let server = axum_server::from_tcp(listener).handle(handle.clone());
                substrate.spawn("http", async move {
                    if let Err(e) = server.serve(service).await {
                        tracing::error!(error = %e, "HTTP server stopped");
                    }
                });
            }
        }

        tracing::info!(
            address = %local_addr,
            tls = tls_enabled,
            drain_secs = settings.drain.as_secs(),
            terminate_secs = settings.terminate.as_secs(),
            "Service started"
        );

        Ok(Self {
            binding: Mutex::new(Some(ServiceBinding { handle, local_addr })),
            substrate,
            triggered: AtomicBool::new(false),
            settings,
            local_addr,
        })
    }

    /// Address the listener was bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for SIGTERM or Ctrl-C, then run the shutdown hook.
    pub async fn run_until_signal(&self) -> ShutdownReport {
        signals::termination().await;
        self.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_timeouts() {
        let timeouts = TimeoutConfig {
            entity_secs: 1,
            drain_secs: 2,
            terminate_secs: 3,
        };
        let settings = LifecycleSettings::from(&timeouts);
        assert_eq!(settings.drain, Duration::from_secs(2));
        assert_eq!(settings.terminate, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn bind_conflict_is_fatal() {
        let first = ServiceLifecycle::bind(0, None, axum::Router::new(), LifecycleSettings::default()).unwrap();
        let port = first.local_addr().port();

        let second = ServiceLifecycle::bind(port, None, axum::Router::new(), LifecycleSettings::default());
        assert!(matches!(second, Err(LifecycleError::Bind(_))));

        first.shutdown().await;
    }
}
