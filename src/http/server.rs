//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with product, health, and admin routes
//! - Wire up middleware (request ID, tracing, timeout, body limit,
//!   concurrency limit, metrics, rate limit)
//! - Serve on a listener until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::catalog::Maintenance;
use crate::config::CatalogConfig;
use crate::dispatch::Dispatcher;
use crate::http::handlers;
use crate::http::request::{self, UuidRequestId, X_REQUEST_ID};
use crate::observability::metrics;
use crate::security::{rate_limit_middleware, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub maintenance: Maintenance,
    pub config: Arc<CatalogConfig>,
}

/// HTTP server for the catalog.
pub struct HttpServer {
    router: Router,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    pub fn new(config: Arc<CatalogConfig>, dispatcher: Dispatcher) -> Self {
        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::from_config(&config.rate_limit)));

        let maintenance = Maintenance::new(dispatcher.data().clone());
        let state = AppState {
            dispatcher,
            maintenance,
            config,
        };
        let router = Self::build_router(state, rate_limiter.clone());
        Self {
            router,
            rate_limiter,
        }
    }

    /// The fully layered router. Tests drive it in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, rate_limiter: Option<Arc<RateLimiter>>) -> Router {
        let config = state.config.clone();

        let products = Router::new()
            .route(
                "/",
                get(handlers::list_products).post(handlers::create_product),
            )
            .route(
                "/{id}",
                get(handlers::get_product)
                    .put(handlers::update_product)
                    .patch(handlers::toggle_activate),
            );

        let mut app = Router::new()
            .nest("/api/products", products)
            .route("/health", get(handlers::health));

        if config.admin.enabled {
            app = app.merge(admin::router(state.clone()));
        }

        let mut app = app.with_state(state);

        if let Some(limiter) = rate_limiter {
            app = app.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        app.layer(middleware::from_fn(record_metrics))
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_concurrent_requests))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request::request_id(req.headers()),
                    method = %req.method(),
                    path = %req.uri().path(),
                )
            }))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), UuidRequestId))
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(limiter) = &self.rate_limiter {
            limiter.clone().spawn_eviction(shutdown.resubscribe());
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn record_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
