//! Store side of the product operations.
//!
//! Nothing here reads or invalidates the cache. The dispatcher reads
//! through and invalidates around these calls, so only store work runs
//! under a circuit breaker.

use std::sync::Arc;

use crate::catalog::cache_aside::CacheAside;
use crate::catalog::product::{NewProduct, Product, ProductChanges};
use crate::error::{CatalogError, CatalogResult};
use crate::storage::ProductStore;

/// Product CRUD against the persistent store. Mutations run in a single
/// transaction each.
#[derive(Clone)]
pub struct ProductService {
    data: CacheAside,
}

impl ProductService {
    pub fn new(data: CacheAside) -> Self {
        Self { data }
    }

    /// Cache-aside access shared with the dispatcher.
    pub fn data(&self) -> &CacheAside {
        &self.data
    }

    fn store(&self) -> &Arc<dyn ProductStore> {
        self.data.store()
    }

    pub async fn get_all_products(&self) -> CatalogResult<Vec<Product>> {
        Ok(self.store().find_all(None).await?)
    }

    pub async fn get_active_products(&self) -> CatalogResult<Vec<Product>> {
        let all = self.store().find_all(None).await?;
        Ok(all.into_iter().filter(|p| p.activate).collect())
    }

    pub async fn get_product_by_id(&self, id: i64) -> CatalogResult<Product> {
        self.store()
            .find_by_id(id, None)
            .await?
            .ok_or(CatalogError::not_found(id))
    }

    pub async fn create_product(&self, input: NewProduct) -> CatalogResult<Product> {
        input.validate()?;
        let product = self
            .data
            .with_transaction(|store, tx| async move { Ok(store.create(input, Some(tx)).await?) })
            .await?;

        tracing::info!(product_id = product.id, "Product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: i64, changes: ProductChanges) -> CatalogResult<Product> {
        changes.validate()?;
        self.data
            .with_transaction(|store, tx| async move {
                store
                    .update(id, changes, Some(tx))
                    .await?
                    .ok_or(CatalogError::not_found(id))
            })
            .await
    }

    /// Flip the activation flag.
    pub async fn toggle_activate(&self, id: i64) -> CatalogResult<Product> {
        self.data
            .with_transaction(|store, tx| async move {
                let current = store
                    .find_by_id(id, Some(tx))
                    .await?
                    .ok_or(CatalogError::not_found(id))?;
                let changes = ProductChanges {
                    activate: Some(!current.activate),
                    ..Default::default()
                };
                store
                    .update(id, changes, Some(tx))
                    .await?
                    .ok_or(CatalogError::not_found(id))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use crate::storage::{MemoryCache, MemoryStore};
    use std::time::Duration;

    fn service() -> (ProductService, Arc<MemoryCache>, Arc<MemoryStore>) {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryStore::with_products(vec![
            NewProduct {
                name: "X".into(),
                price: 9.99,
                activate: true,
            },
            NewProduct {
                name: "Retired".into(),
                price: 5.0,
                activate: false,
            },
        ]));
        let data = CacheAside::new(cache.clone(), store.clone(), Duration::from_secs(3600));
        (ProductService::new(data), cache, store)
    }

    #[tokio::test]
    async fn test_listing_and_active_filter() {
        let (svc, _, _) = service();

        assert_eq!(svc.get_all_products().await.unwrap().len(), 2);
        let active = svc.get_active_products().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "X");
    }

    #[tokio::test]
    async fn test_never_touches_cache() {
        let (svc, cache, store) = service();

        svc.get_product_by_id(1).await.unwrap();
        svc.get_product_by_id(1).await.unwrap();
        assert_eq!(store.read_count(), 2);

        svc.update_product(
            1,
            ProductChanges {
                price: Some(19.99),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(cache.is_empty());
        assert_eq!(svc.get_product_by_id(1).await.unwrap().price, 19.99);
    }

    #[tokio::test]
    async fn test_create_assigns_next_id() {
        let (svc, _, _) = service();
        let created = svc
            .create_product(NewProduct {
                name: "Chair".into(),
                price: 45.0,
                activate: true,
            })
            .await
            .unwrap();
        assert_eq!(created.id, 3);
        assert_eq!(svc.get_all_products().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_toggle_activate() {
        let (svc, _, _) = service();
        assert!(!svc.toggle_activate(1).await.unwrap().activate);
        assert!(svc.toggle_activate(1).await.unwrap().activate);
    }

    #[tokio::test]
    async fn test_domain_errors() {
        let (svc, _, store) = service();

        let err = svc.get_product_by_id(99).await.unwrap_err();
        assert!(matches!(err, CatalogError::Domain(DomainError::NotFound { id: 99 })));

        let err = svc.toggle_activate(99).await.unwrap_err();
        assert!(matches!(err, CatalogError::Domain(DomainError::NotFound { .. })));
        assert_eq!(store.open_transactions(), 0);

        let err = svc
            .update_product(1, ProductChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Domain(DomainError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_store_outage_is_transient() {
        let (svc, _, store) = service();
        store.set_available(false);
        let err = svc.get_all_products().await.unwrap_err();
        assert!(matches!(err, CatalogError::Transient(_)));
    }
}
