//! Read-through / write-invalidate data access.
//!
//! # Responsibilities
//! - Serve reads from the cache, falling back to the store on a miss
//! - Populate the cache after a store read
//! - Run mutations in a single store transaction
//! - Invalidate affected keys after a successful commit
//!
//! Store work is passed in as a future, so callers can wrap it (for
//! instance in a circuit breaker) without the cache being wrapped too.
//!
//! # Design Decisions
//! - Cache failures never fail a request: a lookup error is a miss, a
//!   population or invalidation error is logged
//! - Invalidate on write instead of updating, so a cached value is only
//!   ever a verbatim copy of a store read
//! - Staleness after a failed invalidation is bounded by the entry expiry
//! - A transaction abandoned mid-flight (caller dropped) is rolled back in
//!   the background

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CatalogResult;
use crate::observability::metrics;
use crate::storage::{CacheStore, ProductStore, TxHandle};

/// Cache-aside access over a cache and a persistent store.
#[derive(Clone)]
pub struct CacheAside {
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn ProductStore>,
    expiry: Duration,
}

impl CacheAside {
    pub fn new(cache: Arc<dyn CacheStore>, store: Arc<dyn ProductStore>, expiry: Duration) -> Self {
        Self {
            cache,
            store,
            expiry,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn store(&self) -> &Arc<dyn ProductStore> {
        &self.store
    }

    /// Read `key` through the cache. `fetch` is only polled on a miss; its
    /// result is written back under `key`.
    pub async fn read<T, Fut>(&self, key: &str, fetch: Fut) -> CatalogResult<T>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = CatalogResult<T>>,
    {
        if let Some(value) = self.lookup(key).await {
            return Ok(value);
        }

        let value = fetch.await?;
        self.populate(key, &value).await;
        Ok(value)
    }

    /// Await `mutation`; if it succeeds, invalidate `keys`.
    pub async fn write<T, Fut>(&self, keys: &[String], mutation: Fut) -> CatalogResult<T>
    where
        Fut: Future<Output = CatalogResult<T>>,
    {
        let value = mutation.await?;
        self.invalidate(keys).await;
        Ok(value)
    }

    /// Cached value for `key`. Lookup and decode failures count as a miss.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    tracing::debug!(key, "Cache hit");
                    metrics::record_cache_lookup("hit");
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                    metrics::record_cache_lookup("error");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(key, "Cache miss, fetching from store");
                metrics::record_cache_lookup("miss");
                None
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache lookup failed, falling back to store");
                metrics::record_cache_lookup("error");
                None
            }
        }
    }

    /// Commit if `operation` succeeds, roll back otherwise.
    pub async fn with_transaction<T, F, Fut>(&self, operation: F) -> CatalogResult<T>
    where
        F: FnOnce(Arc<dyn ProductStore>, TxHandle) -> Fut,
        Fut: Future<Output = CatalogResult<T>>,
    {
        let tx = self.store.begin().await?;
        let mut guard = TransactionGuard {
            store: self.store.clone(),
            tx: Some(tx),
        };

        match operation(self.store.clone(), tx).await {
            Ok(value) => {
                let committed = self.store.commit(tx).await;
                if committed.is_ok() {
                    guard.tx = None;
                }
                committed?;
                Ok(value)
            }
            Err(e) => {
                guard.tx = None;
                if let Err(rb) = self.store.rollback(tx).await {
                    tracing::error!(tx = tx.id(), error = %rb, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Delete `keys` from the cache. Failures are logged, not returned.
    pub async fn invalidate(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.cache.delete(key).await {
                tracing::warn!(
                    key = %key,
                    error = %e,
                    expiry_secs = self.expiry.as_secs(),
                    "Cache invalidation failed; entry stays stale until expiry"
                );
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to serialize value for cache");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, raw, self.expiry).await {
            tracing::warn!(key, error = %e, "Cache population failed");
        }
    }
}

/// Rolls back a transaction that was neither committed nor rolled back,
/// e.g. because the surrounding future was dropped on timeout.
struct TransactionGuard {
    store: Arc<dyn ProductStore>,
    tx: Option<TxHandle>,
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let store = self.store.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = store.rollback(tx).await {
                        tracing::warn!(tx = tx.id(), error = %e, "Background rollback failed");
                    }
                });
            }
            Err(_) => tracing::warn!(tx = tx.id(), "Abandoned transaction outside runtime"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::product::{NewProduct, Product, ProductChanges};
    use crate::error::CatalogError;
    use crate::storage::{MemoryCache, MemoryStore};

    fn setup() -> (CacheAside, Arc<MemoryCache>, Arc<MemoryStore>) {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryStore::with_products(vec![NewProduct {
            name: "X".into(),
            price: 9.99,
            activate: true,
        }]));
        let access = CacheAside::new(cache.clone(), store.clone(), Duration::from_secs(3600));
        (access, cache, store)
    }

    async fn read_one(access: &CacheAside, id: i64) -> CatalogResult<Product> {
        let store = access.store().clone();
        access
            .read(&format!("product:{id}"), async move {
                store.find_by_id(id, None).await?.ok_or(CatalogError::not_found(id))
            })
            .await
    }

    #[tokio::test]
    async fn test_second_read_served_from_cache() {
        let (access, cache, store) = setup();

        let first = read_one(&access, 1).await.unwrap();
        let second = read_one(&access, 1).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.read_count(), 1);
        assert!(cache.contains("product:1"));
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let (access, cache, store) = setup();
        assert!(read_one(&access, 5).await.is_err());
        assert!(read_one(&access, 5).await.is_err());
        assert_eq!(store.read_count(), 2);
        assert!(!cache.contains("product:5"));
    }

    #[tokio::test]
    async fn test_write_invalidates_keys() {
        let (access, cache, store) = setup();
        read_one(&access, 1).await.unwrap();

        let keys = vec!["product:1".to_string()];
        access
            .write(
                &keys,
                access.with_transaction(|store, tx| async move {
                    let changes = ProductChanges {
                        price: Some(19.99),
                        ..Default::default()
                    };
                    store.update(1, changes, Some(tx)).await?.ok_or(CatalogError::not_found(1))
                }),
            )
            .await
            .unwrap();

        assert!(!cache.contains("product:1"));
        let refreshed = read_one(&access, 1).await.unwrap();
        assert_eq!(refreshed.price, 19.99);
        assert_eq!(store.read_count(), 2);
        assert!(cache.contains("product:1"));
    }

    #[tokio::test]
    async fn test_failed_mutation_rolls_back_and_keeps_cache() {
        let (access, cache, store) = setup();
        read_one(&access, 1).await.unwrap();

        let keys = vec!["product:1".to_string()];
        let res: CatalogResult<Product> = access
            .write(
                &keys,
                access.with_transaction(|store, tx| async move {
                    let changes = ProductChanges {
                        price: Some(50.0),
                        ..Default::default()
                    };
                    store.update(1, changes, Some(tx)).await?;
                    Err(CatalogError::internal("second step failed"))
                }),
            )
            .await;

        assert!(res.is_err());
        assert_eq!(store.open_transactions(), 0);
        assert!(cache.contains("product:1"), "nothing committed, nothing invalidated");
        let stored = store.find_by_id(1, None).await.unwrap().unwrap();
        assert_eq!(stored.price, 9.99);
    }

    #[tokio::test]
    async fn test_read_survives_cache_outage() {
        let (access, cache, store) = setup();
        cache.set_available(false);

        let product = read_one(&access, 1).await.unwrap();
        assert_eq!(product.name, "X");
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn test_write_survives_invalidation_failure() {
        let (access, cache, store) = setup();
        cache.set_available(false);

        let keys = vec!["product:1".to_string()];
        let updated = access
            .write(
                &keys,
                access.with_transaction(|store, tx| async move {
                    let changes = ProductChanges {
                        activate: Some(false),
                        ..Default::default()
                    };
                    store.update(1, changes, Some(tx)).await?.ok_or(CatalogError::not_found(1))
                }),
            )
            .await
            .unwrap();

        assert!(!updated.activate);
        assert!(!store.find_by_id(1, None).await.unwrap().unwrap().activate);
    }

    #[tokio::test]
    async fn test_fetch_not_polled_on_hit() {
        let (access, _cache, store) = setup();
        read_one(&access, 1).await.unwrap();

        let hit: Product = access
            .read("product:1", async { Err(CatalogError::internal("must not run")) })
            .await
            .unwrap();
        assert_eq!(hit.name, "X");
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn test_rejected_write_invalidates_nothing() {
        let (access, cache, _store) = setup();
        read_one(&access, 1).await.unwrap();

        let keys = vec!["product:1".to_string()];
        let res: CatalogResult<Product> = access
            .write(&keys, async { Err(CatalogError::internal("rejected")) })
            .await;
        assert!(res.is_err());
        assert!(cache.contains("product:1"));
    }

    #[tokio::test]
    async fn test_dropped_transaction_is_rolled_back() {
        let (access, _cache, store) = setup();

        let pending = access.with_transaction(|store, tx| async move {
            store.create(
                NewProduct {
                    name: "Ghost".into(),
                    price: 1.0,
                    activate: true,
                },
                Some(tx),
            )
            .await?;
            std::future::pending::<CatalogResult<()>>().await
        });
        let _ = tokio::time::timeout(Duration::from_millis(20), pending).await;

        for _ in 0..10 {
            if store.open_transactions() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(store.open_transactions(), 0);
        assert_eq!(store.find_all(None).await.unwrap().len(), 1);
    }
}
