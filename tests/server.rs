//! End-to-end tests against a real listener.

use std::time::{Duration, Instant};

mod common;
use common::*;

#[tokio::test]
async fn test_concurrent_clients() {
    let (addr, shutdown, handle) = spawn_server(test_config()).await;

    let client = reqwest::Client::new();
    let concurrency = 10;
    let requests_per_task = 20;
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{addr}/api/products/1");
        tasks.push(tokio::spawn(async move {
            let mut ok = 0;
            for _ in 0..requests_per_task {
                if let Ok(res) = client.get(&url).send().await {
                    if res.status().is_success() {
                        ok += 1;
                    }
                }
            }
            ok
        }));
    }

    let mut succeeded = 0;
    for task in tasks {
        succeeded += task.await.unwrap();
    }
    println!(
        "{} requests in {:?}",
        concurrency * requests_per_task,
        start.elapsed()
    );
    assert_eq!(succeeded, concurrency * requests_per_task);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_rate_limit_per_client_ip() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.max_requests = 5;
    let (addr, shutdown, _) = spawn_server(config).await;

    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/products");
    for _ in 0..5 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["ratelimit-limit"], "5");
    }

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), 429);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["code"], "RATE_LIMITED");

    shutdown.trigger();
}

#[tokio::test]
async fn test_admin_over_http() {
    let (addr, shutdown, _) = spawn_server(test_config()).await;
    let client = reqwest::Client::new();

    client
        .get(format!("http://{addr}/api/products"))
        .send()
        .await
        .unwrap();

    let breakers: Vec<product_catalog::resilience::BreakerSnapshot> = client
        .get(format!("http://{addr}/admin/breakers"))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(breakers.len(), 1);
    assert_eq!(breakers[0].operation, "getAllProducts");
    assert_eq!(breakers[0].failure_threshold, 3);

    let res = client
        .get(format!("http://{addr}/admin/breakers"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    shutdown.trigger();
}
