//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use product_catalog::catalog::NewProduct;
use product_catalog::config::CatalogConfig;
use product_catalog::lifecycle::startup::build_dispatcher;
use product_catalog::storage::{MemoryCache, MemoryStore};
use product_catalog::{Dispatcher, HttpServer, Shutdown};

pub const ADMIN_KEY: &str = "test-admin-key";

/// Router plus handles on the backing stores for failure injection.
pub struct TestApp {
    pub router: Router,
    pub dispatcher: Dispatcher,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
}

/// Defaults tuned for tests: small breaker threshold, admin on, rate
/// limiting off.
pub fn test_config() -> CatalogConfig {
    let mut config = CatalogConfig::default();
    config.breaker.failure_threshold = 3;
    config.breaker.reset_timeout_secs = 10;
    config.breaker.timeout_ms = 500;
    config.rate_limit.enabled = false;
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config
}

/// Product 1 "X" (active), product 2 "Chair" (inactive).
pub fn seeded_store() -> MemoryStore {
    MemoryStore::with_products(vec![
        NewProduct {
            name: "X".into(),
            price: 9.99,
            activate: true,
        },
        NewProduct {
            name: "Chair".into(),
            price: 45.0,
            activate: false,
        },
    ])
}

pub fn app(config: CatalogConfig) -> TestApp {
    app_with_store(config, seeded_store())
}

pub fn app_with_store(config: CatalogConfig, store: MemoryStore) -> TestApp {
    let store = Arc::new(store);
    let cache = Arc::new(MemoryCache::new());
    let dispatcher = build_dispatcher(&config, cache.clone(), store.clone());
    let server = HttpServer::new(Arc::new(config), dispatcher.clone());
    TestApp {
        router: server.router(),
        dispatcher,
        store,
        cache,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn raw(method: Method, uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

pub fn admin_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_KEY}"))
        .body(Body::empty())
        .unwrap()
}

pub fn admin_json(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_KEY}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send a request through the router in-process.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, body)
}

/// Serve on an ephemeral port. Returns the address, the shutdown
/// coordinator, and the server task.
pub async fn spawn_server(config: CatalogConfig) -> (SocketAddr, Shutdown, JoinHandle<()>) {
    let store = Arc::new(seeded_store());
    let cache = Arc::new(MemoryCache::new());
    let dispatcher = build_dispatcher(&config, cache, store);
    let server = HttpServer::new(Arc::new(config), dispatcher);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown, handle)
}
