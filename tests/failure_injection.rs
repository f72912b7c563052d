//! Failure injection: store outages, slow stores, and cache faults seen
//! through the HTTP surface.

use std::time::Duration;

use axum::http::{Method, StatusCode};
use product_catalog::resilience::CircuitState;
use serde_json::json;

mod common;
use common::*;

#[tokio::test(start_paused = true)]
async fn test_store_outage_opens_circuit() {
    let app = app(test_config());
    app.store.set_available(false);

    for _ in 0..3 {
        let (status, _, body) = send(&app.router, get("/api/products")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_ERROR");
    }
    let attempts = app.store.read_count();
    assert_eq!(attempts, 3);

    let (status, _, body) = send(&app.router, get("/api/products")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    assert_eq!(body["statusCode"], 503);
    assert_eq!(app.store.read_count(), attempts, "open circuit must not reach the store");

    let (status, _, body) = send(&app.router, admin_get("/admin/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test(start_paused = true)]
async fn test_circuit_recovers_after_reset_timeout() {
    let app = app(test_config());
    app.store.set_available(false);
    for _ in 0..3 {
        send(&app.router, get("/api/products")).await;
    }
    app.store.set_available(true);

    let (status, _, _) = send(&app.router, get("/api/products")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    tokio::time::advance(Duration::from_secs(10)).await;

    let attempts = app.store.read_count();
    let (status, _, _) = send(&app.router, get("/api/products")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.read_count(), attempts + 1, "exactly one probe");

    let (_, _, body) = send(&app.router, admin_get("/admin/breakers")).await;
    let breaker = &body.as_array().unwrap()[0];
    assert_eq!(breaker["operation"], "getAllProducts");
    assert_eq!(breaker["state"], "CLOSED");
    assert_eq!(breaker["failure_count"], 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_probe_reopens() {
    let app = app(test_config());
    app.store.set_available(false);
    for _ in 0..3 {
        send(&app.router, get("/api/products/1")).await;
    }

    tokio::time::advance(Duration::from_secs(10)).await;
    let (status, _, _) = send(&app.router, get("/api/products/1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "probe runs and fails");

    let (status, _, _) = send(&app.router, get("/api/products/1")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let breaker = app.dispatcher.registry().get("getProductById").unwrap();
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_client_errors_never_trip() {
    let app = app(test_config());

    for _ in 0..10 {
        let (status, _, _) = send(&app.router, get("/api/products/404")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = send(
            &app.router,
            json(Method::POST, "/api/products", json!({"name": "", "price": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (_, _, body) = send(&app.router, admin_get("/admin/breakers")).await;
    for breaker in body.as_array().unwrap() {
        assert_eq!(breaker["state"], "CLOSED");
        assert_eq!(breaker["failure_count"], 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_breakers_are_isolated_per_operation() {
    let app = app(test_config());
    app.store.set_available(false);
    for _ in 0..3 {
        send(&app.router, get("/api/products")).await;
    }
    app.store.set_available(true);

    let (status, _, _) = send(&app.router, get("/api/products")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _, _) = send(&app.router, get("/api/products/1")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_counts_as_failure() {
    let mut config = test_config();
    config.breaker.timeout_ms = 100;
    config.breaker.failure_threshold = 1;
    let app = app(config);
    app.store.set_latency(Duration::from_secs(2));

    let (status, _, body) = send(&app.router, get("/api/products")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL_ERROR");

    let (status, _, _) = send(&app.router, get("/api/products")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_update_invalidates_cached_product() {
    let app = app(test_config());

    let (_, _, body) = send(&app.router, get("/api/products/1")).await;
    assert_eq!(body["data"]["price"], 9.99);
    assert!(app.cache.contains("product:1"));

    let (status, _, _) = send(
        &app.router,
        json(Method::PUT, "/api/products/1", json!({"price": 19.99})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!app.cache.contains("product:1"));

    let reads = app.store.read_count();
    let (_, _, body) = send(&app.router, get("/api/products/1")).await;
    assert_eq!(body["data"]["price"], 19.99);
    assert_eq!(app.store.read_count(), reads + 1);
    assert!(app.cache.contains("product:1"));
}

#[tokio::test]
async fn test_cached_reads_survive_store_outage() {
    let app = app(test_config());
    send(&app.router, get("/api/products/1")).await;

    app.store.set_available(false);
    let (status, _, body) = send(&app.router, get("/api/products/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "X");
}

#[tokio::test(start_paused = true)]
async fn test_cached_product_served_while_circuit_open() {
    let app = app(test_config());
    let (status, _, _) = send(&app.router, get("/api/products/1")).await;
    assert_eq!(status, StatusCode::OK);

    app.store.set_available(false);
    for id in [2, 3, 4] {
        let (status, _, _) = send(&app.router, get(&format!("/api/products/{id}"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
    let (status, _, _) = send(&app.router, get("/api/products/2")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let attempts = app.store.read_count();
    let (status, _, body) = send(&app.router, get("/api/products/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "X");
    assert_eq!(app.store.read_count(), attempts);
}

#[tokio::test]
async fn test_cache_outage_falls_through_to_store() {
    let app = app(test_config());
    app.cache.set_available(false);

    let (status, _, _) = send(&app.router, get("/api/products")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(
        &app.router,
        json(Method::POST, "/api/products", json!({"name": "Lamp", "price": 12.0})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    app.cache.set_available(true);
    let (_, _, body) = send(&app.router, get("/api/products")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_failed_write_leaves_no_open_transaction() {
    let app = app(test_config());
    app.store.set_available(false);

    let (status, _, _) = send(&app.router, json(Method::PATCH, "/api/products/1", json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.store.open_transactions(), 0);
}
