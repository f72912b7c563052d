//! Request identification and extraction.
//!
//! # Responsibilities
//! - Generate a UUID v4 request ID when the client sent none
//! - Parse product ids from the path
//! - Decode JSON bodies, mapping failures to the error envelope
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Extraction failures are domain errors, so they never reach a breaker

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, HeaderName, HeaderValue, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::{CatalogError, DomainError};
use crate::http::response::ApiError;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates request IDs for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of the current request, or "unknown".
pub fn request_id(headers: &axum::http::HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Integer product id from the `{id}` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductId(pub i64);

impl<S> FromRequestParts<S> for ProductId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::from(CatalogError::from(DomainError::InvalidId(e.body_text()))))?;

        raw.trim()
            .parse::<i64>()
            .map(ProductId)
            .map_err(|_| ApiError::from(CatalogError::from(DomainError::InvalidId(raw))))
    }
}

/// JSON body whose rejections use the catalog error envelope.
#[derive(Debug)]
pub struct CatalogJson<T>(pub T);

impl<S, T> FromRequest<S> for CatalogJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(CatalogJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", rejection.body_text());
    }
    let message = match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "expected request with `Content-Type: application/json`".to_string()
        }
        other => other.body_text(),
    };
    ApiError::invalid_input(message)
}
