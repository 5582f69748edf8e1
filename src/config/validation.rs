//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, buffers > 0)
//! - Check address fields parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TunnelConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::TunnelConfig;
use crate::net::target::Target;

/// A single failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("target.default_host must not be empty")]
    EmptyDefaultTarget,

    #[error("target.default_host {0:?} has an invalid port")]
    InvalidDefaultTarget(String),

    #[error("listener address {0:?} is not a socket address")]
    InvalidBindAddress(String),

    #[error("timeouts.idle_secs must be greater than zero")]
    ZeroIdleTimeout,

    #[error("buffers.read_size must be greater than zero")]
    ZeroReadSize,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check every rule and collect the failures.
pub fn validate_config(config: &TunnelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let default_host = config.target.default_host.trim();
    if default_host.is_empty() {
        errors.push(ValidationError::EmptyDefaultTarget);
    } else if Target::parse(default_host).is_err() {
        errors.push(ValidationError::InvalidDefaultTarget(default_host.to_string()));
    }

    // Hostnames are resolved at bind time; only IP literals are checked here.
    let bind = config.listener.socket_address();
    let bind_host = &config.listener.bind_address;
    let looks_numeric =
        bind_host.chars().all(|c| c.is_ascii_digit() || c == '.') || bind_host.contains(':');
    if bind_host.is_empty() || (looks_numeric && bind.parse::<SocketAddr>().is_err()) {
        errors.push(ValidationError::InvalidBindAddress(bind));
    }

    if config.timeouts.idle_secs == 0 {
        errors.push(ValidationError::ZeroIdleTimeout);
    }

    if config.buffers.read_size == 0 {
        errors.push(ValidationError::ZeroReadSize);
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
