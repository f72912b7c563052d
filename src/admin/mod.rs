//! Admin surface: service status, breaker inspection, and catalog
//! maintenance (seed, cleanup, inventory report).

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/breakers", get(get_breakers))
        .route("/admin/seed", post(seed_catalog))
        .route("/admin/cleanup", post(cleanup_catalog))
        .route("/admin/report", get(inventory_report))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
