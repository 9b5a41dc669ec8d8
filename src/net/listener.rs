//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind the wildcard address on the configured port
//! - Hand back a non-blocking std listener ready for `axum_server::from_tcp`

use std::net::{Ipv4Addr, SocketAddr, TcpListener};

use thiserror::Error;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind `0.0.0.0:port`. Port 0 picks an ephemeral port.
pub fn bind_wildcard(port: u16) -> Result<TcpListener, ListenerError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let bind_err = |source| ListenerError::Bind { addr, source };

    let listener = TcpListener::bind(addr).map_err(bind_err)?;
    listener.set_nonblocking(true).map_err(bind_err)?;

    let local_addr = listener.local_addr().map_err(bind_err)?;
    tracing::info!(address = %local_addr, "Listener bound");

    Ok(listener)
}
