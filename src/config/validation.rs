//! Configuration validation.
//!
//! Semantic checks that serde cannot express. Returns every violation,
//! not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::PipelineConfig;

/// A single semantic violation in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("observability.service_name must not be empty")]
    EmptyServiceName,
    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),
    #[error("listener.tls.{0} must not be empty")]
    EmptyTlsPath(&'static str),
}

/// Validate a configuration, collecting all violations.
pub fn validate_config(config: &PipelineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("entity_secs", timeouts.entity_secs),
        ("drain_secs", timeouts.drain_secs),
        ("terminate_secs", timeouts.terminate_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    let observability = &config.observability;
    if observability.service_name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() {
            errors.push(ValidationError::EmptyTlsPath("cert_path"));
        }
        if tls.key_path.is_empty() {
            errors.push(ValidationError::EmptyTlsPath("key_path"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
