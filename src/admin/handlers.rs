use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::catalog::maintenance::{self, CleanupSummary, SeedSummary, DEFAULT_CLEANUP_DAYS};
use crate::catalog::{InventoryReport, NewProduct};
use crate::http::request::CatalogJson;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::resilience::{BreakerSnapshot, CircuitState};

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub open_breakers: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let snapshots = state.dispatcher.breaker_snapshots();
    let open_breakers = snapshots
        .iter()
        .filter(|s| s.state != CircuitState::Closed)
        .count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: if open_breakers == 0 { "operational" } else { "degraded" }.to_string(),
        open_breakers,
    })
}

pub async fn get_breakers(State(state): State<AppState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.dispatcher.breaker_snapshots())
}

/// Body of `POST /admin/seed`. An empty list seeds the sample products.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SeedRequest {
    #[serde(default)]
    pub products: Vec<NewProduct>,
}

/// Body of `POST /admin/cleanup`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupRequest {
    #[serde(default = "default_cleanup_days")]
    pub older_than_days: u32,
}

fn default_cleanup_days() -> u32 {
    DEFAULT_CLEANUP_DAYS
}

pub async fn seed_catalog(
    State(state): State<AppState>,
    CatalogJson(request): CatalogJson<SeedRequest>,
) -> Result<(StatusCode, Json<SeedSummary>), ApiError> {
    let products = if request.products.is_empty() {
        maintenance::sample_products()
    } else {
        request.products
    };
    let summary = state.maintenance.seed(products).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn cleanup_catalog(
    State(state): State<AppState>,
    CatalogJson(request): CatalogJson<CleanupRequest>,
) -> Result<Json<CleanupSummary>, ApiError> {
    let summary = state
        .maintenance
        .cleanup_older_than(request.older_than_days)
        .await?;
    Ok(Json(summary))
}

pub async fn inventory_report(State(state): State<AppState>) -> Result<Json<InventoryReport>, ApiError> {
    Ok(Json(state.maintenance.report().await?))
}
