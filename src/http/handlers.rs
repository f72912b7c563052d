//! Product endpoints under `/api/products`.
//!
//! Handlers only translate between HTTP and the dispatcher; every store
//! call behind them goes through a circuit breaker.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::catalog::{NewProduct, Product, ProductChanges};
use crate::http::request::{CatalogJson, ProductId};
use crate::http::response::{self, ApiError, Envelope};
use crate::http::server::AppState;

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

/// Query parameters for the listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub active: Option<bool>,
}

pub async fn list_products(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<Product>> {
    let Query(params) = params.map_err(|e| ApiError::invalid_input(e.body_text()))?;

    let products = if params.active.unwrap_or(false) {
        state.dispatcher.get_active_products().await?
    } else {
        state.dispatcher.get_all_products().await?
    };
    Ok(response::ok(products, "Products fetched successfully"))
}

pub async fn get_product(State(state): State<AppState>, ProductId(id): ProductId) -> ApiResult<Product> {
    let product = state.dispatcher.get_product_by_id(id).await?;
    Ok(response::ok(product, "Product fetched successfully"))
}

pub async fn create_product(
    State(state): State<AppState>,
    CatalogJson(input): CatalogJson<NewProduct>,
) -> Result<(StatusCode, Json<Envelope<Product>>), ApiError> {
    let product = state.dispatcher.create_product(input).await?;
    Ok(response::created(product, "Product created successfully"))
}

pub async fn update_product(
    State(state): State<AppState>,
    ProductId(id): ProductId,
    CatalogJson(changes): CatalogJson<ProductChanges>,
) -> ApiResult<Product> {
    let product = state.dispatcher.update_product(id, changes).await?;
    Ok(response::ok(product, "Product updated successfully"))
}

pub async fn toggle_activate(State(state): State<AppState>, ProductId(id): ProductId) -> ApiResult<Product> {
    let product = state.dispatcher.toggle_activate(id).await?;
    let message = if product.activate {
        "Product activated successfully"
    } else {
        "Product deactivated successfully"
    };
    Ok(response::ok(product, message))
}

/// Liveness probe. Never touches the store.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
