//! Error taxonomy for catalog operations.
//!
//! # Classes
//! - `Domain`: expected business-rule failures (not found, invalid input).
//!   Never counted against breaker health.
//! - `Transient`: store failures, timeouts, internal faults. Counted.
//! - `ServiceUnavailable`: produced only when a breaker short-circuits.
//!
//! Every class maps to a fixed status/code pair at the HTTP boundary.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::resilience::FailureClass;
use crate::storage::StoreError;

/// Business-rule failures. These reach the caller verbatim.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("product {id} not found")]
    NotFound { id: i64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid product id '{0}': must be an integer")]
    InvalidId(String),
}

/// Infrastructure failures that count against breaker health.
#[derive(Debug, Error)]
pub enum TransientFailure {
    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout { operation: String, after: Duration },

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Outcome of a catalog operation that did not succeed.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Transient(#[from] TransientFailure),

    #[error("{operation} is temporarily unavailable")]
    ServiceUnavailable { operation: String },
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        CatalogError::Transient(TransientFailure::Store(err))
    }
}

impl CatalogError {
    pub fn not_found(id: i64) -> Self {
        DomainError::NotFound { id }.into()
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        DomainError::InvalidInput(message.into()).into()
    }

    pub fn internal(message: impl Into<String>) -> Self {
        TransientFailure::Internal(message.into()).into()
    }

    /// HTTP status this outcome maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            CatalogError::Domain(DomainError::NotFound { .. }) => StatusCode::NOT_FOUND,
            CatalogError::Domain(_) => StatusCode::BAD_REQUEST,
            CatalogError::Transient(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CatalogError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable error code. Clients branch on this, not the message.
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::Domain(DomainError::NotFound { .. }) => "NOT_FOUND",
            CatalogError::Domain(DomainError::InvalidInput(_)) => "INVALID_INPUT",
            CatalogError::Domain(DomainError::InvalidId(_)) => "INVALID_ID",
            CatalogError::Transient(_) => "INTERNAL_ERROR",
            CatalogError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
        }
    }
}

impl FailureClass for CatalogError {
    fn is_client_error(&self) -> bool {
        match self {
            CatalogError::Domain(_) => true,
            // Short-circuits must never feed back into the breaker.
            CatalogError::ServiceUnavailable { .. } => true,
            CatalogError::Transient(_) => false,
        }
    }
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
