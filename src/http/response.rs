//! Response envelopes and error mapping.
//!
//! # Responsibilities
//! - Wrap successful payloads as `{ data, message }`
//! - Map every failure to `{ error, code, statusCode }` with its status
//!
//! # Design Decisions
//! - Transient failure details are logged, never echoed to clients
//! - The error code is the contract; the message is for humans

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{CatalogError, DomainError};

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub message: &'static str,
}

pub fn ok<T: Serialize>(data: T, message: &'static str) -> Json<Envelope<T>> {
    Json(Envelope { data, message })
}

pub fn created<T: Serialize>(data: T, message: &'static str) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, ok(data, message))
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'static str,
    #[serde(rename = "statusCode")]
    status_code: u16,
}

/// A failure ready to be sent to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Missing or invalid API key")
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self {
            retry_after_secs: Some(retry_after_secs),
            ..Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Too many requests from this IP, please try again later",
            )
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let message = match &err {
            CatalogError::Domain(DomainError::NotFound { .. }) => "Product not found".to_string(),
            CatalogError::Domain(e) => e.to_string(),
            CatalogError::Transient(e) => {
                tracing::error!(error = %e, "Operation failed");
                "An internal error occurred".to_string()
            }
            CatalogError::ServiceUnavailable { operation } => {
                tracing::debug!(operation = %operation, "Responding service unavailable");
                "Service is temporarily unavailable, please try again later".to_string()
            }
        };
        Self::new(err.status(), err.code(), message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            code: self.code,
            status_code: self.status.as_u16(),
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransientFailure;
    use crate::storage::StoreError;

    #[test]
    fn test_catalog_errors_map_to_status_and_code() {
        let cases = [
            (CatalogError::not_found(7), 404, "NOT_FOUND"),
            (CatalogError::invalid("bad price"), 400, "INVALID_INPUT"),
            (DomainError::InvalidId("abc".into()).into(), 400, "INVALID_ID"),
            (StoreError::Unavailable.into(), 500, "INTERNAL_ERROR"),
            (
                CatalogError::ServiceUnavailable {
                    operation: "getAllProducts".into(),
                },
                503,
                "SERVICE_UNAVAILABLE",
            ),
        ];
        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status().as_u16(), status);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn test_transient_details_are_hidden() {
        let api = ApiError::from(CatalogError::from(TransientFailure::Internal(
            "connection string leaked".into(),
        )));
        assert!(!api.message().contains("connection string"));
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ApiError::rate_limited(12).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "12");
    }
}
