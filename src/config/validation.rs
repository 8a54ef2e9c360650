//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use super::schema::ServerConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.max_connections must be greater than 0")]
    ZeroMaxConnections,

    #[error("limits.initial_buffer_size must be greater than 0")]
    ZeroInitialBuffer,

    #[error("limits.max_buffer_size ({max}) is smaller than limits.initial_buffer_size ({initial})")]
    BufferLimitBelowInitial { initial: usize, max: usize },

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("routes.upstream_url {0:?} must start with http:// or https://")]
    InvalidUpstreamUrl(String),
}

/// Check semantic constraints serde cannot express.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    let limits = &config.limits;
    if limits.initial_buffer_size == 0 {
        errors.push(ValidationError::ZeroInitialBuffer);
    }
    if limits.max_buffer_size < limits.initial_buffer_size {
        errors.push(ValidationError::BufferLimitBelowInitial {
            initial: limits.initial_buffer_size,
            max: limits.max_buffer_size,
        });
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    let upstream = &config.routes.upstream_url;
    if !(upstream.starts_with("http://") || upstream.starts_with("https://")) {
        errors.push(ValidationError::InvalidUpstreamUrl(upstream.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
