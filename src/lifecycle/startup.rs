//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order: metrics, store and cache,
//!   breaker registry, dispatcher, optional seed data, router
//! - Start background tasks (cache purge, rate limit eviction)
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::catalog::maintenance::sample_products;
use crate::catalog::{CacheAside, Maintenance, ProductService};
use crate::config::CatalogConfig;
use crate::dispatch::{CatalogRegistry, Dispatcher};
use crate::error::CatalogError;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::storage::{CacheStore, MemoryCache, MemoryStore, ProductStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to seed sample data: {0}")]
    Seed(#[source] CatalogError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Wire the registry, cache-aside access, and service into a dispatcher.
pub fn build_dispatcher(
    config: &CatalogConfig,
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn ProductStore>,
) -> Dispatcher {
    let registry = Arc::new(CatalogRegistry::new().with_listener(metrics::breaker_state_listener()));
    let data = CacheAside::new(cache, store, Duration::from_secs(config.cache.expiry_secs));
    Dispatcher::new(ProductService::new(data), registry, config.breaker.policy())
}

/// Insert the sample products when `store.seed_sample_data` is set.
pub async fn seed_if_configured(config: &CatalogConfig, dispatcher: &Dispatcher) -> Result<(), StartupError> {
    if !config.store.seed_sample_data {
        return Ok(());
    }
    Maintenance::new(dispatcher.data().clone())
        .seed(sample_products())
        .await
        .map_err(StartupError::Seed)?;
    Ok(())
}

/// Purge expired cache entries once per `every` until shutdown.
pub fn spawn_cache_purge(cache: Arc<MemoryCache>, every: Duration, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let purged = cache.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, "Purged expired cache entries");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    })
}

/// Start the service and block until it has shut down.
pub async fn run(config: CatalogConfig) -> Result<(), StartupError> {
    let config = Arc::new(config);

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let cache = Arc::new(MemoryCache::new());
    let store = Arc::new(MemoryStore::new());
    let dispatcher = build_dispatcher(&config, cache.clone(), store);
    seed_if_configured(&config, &dispatcher).await?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());
    spawn_cache_purge(
        cache,
        Duration::from_secs(config.cache.expiry_secs),
        shutdown.subscribe(),
    );

    let server = HttpServer::new(config.clone(), dispatcher);

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
