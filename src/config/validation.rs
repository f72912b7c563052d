//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds > 0)
//! - Check breaker overrides name real operations
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CatalogConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{BreakerOverride, CatalogConfig};
use crate::dispatch::OperationName;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &CatalogConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_concurrent_requests == 0 {
        errors.push(ValidationError::new("listener.max_concurrent_requests", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be > 0"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::new("rate_limit.max_requests", "must be > 0"));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::new("rate_limit.window_secs", "must be > 0"));
        }
    }

    let breaker = &config.breaker;
    if breaker.timeout_ms == 0 {
        errors.push(ValidationError::new("breaker.timeout_ms", "must be > 0"));
    }
    if breaker.failure_threshold == 0 {
        errors.push(ValidationError::new("breaker.failure_threshold", "must be > 0"));
    }
    if breaker.reset_timeout_secs == 0 {
        errors.push(ValidationError::new("breaker.reset_timeout_secs", "must be > 0"));
    }
    for (name, o) in &breaker.operations {
        validate_override(name, o, &mut errors);
    }

    if config.cache.expiry_secs == 0 {
        errors.push(ValidationError::new("cache.expiry_secs", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new("admin.api_key", "required when admin is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_override(name: &str, o: &BreakerOverride, errors: &mut Vec<ValidationError>) {
    let field = |key: &str| format!("breaker.operations.{name}.{key}");

    if OperationName::parse(name).is_none() {
        errors.push(ValidationError::new(
            format!("breaker.operations.{name}"),
            "unknown operation",
        ));
    }
    if o.timeout_ms == Some(0) {
        errors.push(ValidationError::new(field("timeout_ms"), "must be > 0"));
    }
    if o.failure_threshold == Some(0) {
        errors.push(ValidationError::new(field("failure_threshold"), "must be > 0"));
    }
    if o.reset_timeout_secs == Some(0) {
        errors.push(ValidationError::new(field("reset_timeout_secs"), "must be > 0"));
    }
}
