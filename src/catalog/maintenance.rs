//! Operator maintenance: seeding, cleanup of stale inactive products, and
//! inventory reports.
//!
//! # Responsibilities
//! - Bulk-insert products in one transaction
//! - Delete inactive products whose last write is older than a cutoff
//! - Summarise the inventory straight from the store
//!
//! # Design Decisions
//! - Runs directly against the store, outside the per-operation breakers
//! - Every committed change invalidates the keys it affects
//! - Reports never read the cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::cache_aside::CacheAside;
use crate::catalog::keys;
use crate::catalog::product::{NewProduct, Product};
use crate::error::CatalogResult;

/// Default age, in days, after which an inactive product is removed.
pub const DEFAULT_CLEANUP_DAYS: u32 = 30;

/// Products inserted when a seed request names none.
pub fn sample_products() -> Vec<NewProduct> {
    [
        ("Admin sample product", 99.99, true),
        ("Desk lamp", 24.5, true),
        ("Office chair", 149.0, true),
        ("Discontinued stapler", 7.25, false),
    ]
    .into_iter()
    .map(|(name, price, activate)| NewProduct {
        name: name.to_string(),
        price,
        activate,
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedSummary {
    pub seeded: usize,
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupSummary {
    pub removed: usize,
    pub ids: Vec<i64>,
    /// Inactive products last updated before this instant were removed.
    pub cutoff: DateTime<Utc>,
}

/// Inventory totals at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    pub total_products: usize,
    pub active_products: usize,
    /// Sum of all prices.
    pub total_value: f64,
    pub timestamp: DateTime<Utc>,
}

impl InventoryReport {
    pub fn from_products(products: &[Product], timestamp: DateTime<Utc>) -> Self {
        Self {
            total_products: products.len(),
            active_products: products.iter().filter(|p| p.activate).count(),
            total_value: products.iter().map(|p| p.price).sum(),
            timestamp,
        }
    }
}

/// Maintenance tasks over the catalog's data access.
#[derive(Clone)]
pub struct Maintenance {
    data: CacheAside,
}

impl Maintenance {
    pub fn new(data: CacheAside) -> Self {
        Self { data }
    }

    /// Insert `products` atomically. Nothing is written if any is invalid.
    pub async fn seed(&self, products: Vec<NewProduct>) -> CatalogResult<SeedSummary> {
        for product in &products {
            product.validate()?;
        }

        let created = self
            .data
            .with_transaction(|store, tx| async move {
                let mut created = Vec::with_capacity(products.len());
                for input in products {
                    created.push(store.create(input, Some(tx)).await?);
                }
                Ok(created)
            })
            .await?;
        self.data.invalidate(&keys::invalidated_by(None)).await;

        let ids: Vec<i64> = created.iter().map(|p| p.id).collect();
        tracing::info!(seeded = ids.len(), "Catalog seeded");
        Ok(SeedSummary {
            seeded: ids.len(),
            ids,
        })
    }

    /// Remove inactive products not updated since `cutoff`.
    pub async fn cleanup(&self, cutoff: DateTime<Utc>) -> CatalogResult<CleanupSummary> {
        let ids = self
            .data
            .with_transaction(|store, tx| async move {
                let stale: Vec<i64> = store
                    .find_all(Some(tx))
                    .await?
                    .into_iter()
                    .filter(|p| !p.activate && p.updated_at < cutoff)
                    .map(|p| p.id)
                    .collect();
                for id in &stale {
                    store.delete(*id, Some(tx)).await?;
                }
                Ok(stale)
            })
            .await?;

        if !ids.is_empty() {
            let mut stale_keys = keys::invalidated_by(None);
            stale_keys.extend(ids.iter().map(|id| keys::product(*id)));
            self.data.invalidate(&stale_keys).await;
        }

        tracing::info!(removed = ids.len(), cutoff = %cutoff, "Inactive products cleaned up");
        Ok(CleanupSummary {
            removed: ids.len(),
            ids,
            cutoff,
        })
    }

    /// Remove inactive products untouched for `days` days.
    pub async fn cleanup_older_than(&self, days: u32) -> CatalogResult<CleanupSummary> {
        self.cleanup(Utc::now() - chrono::Duration::days(i64::from(days)))
            .await
    }

    pub async fn report(&self) -> CatalogResult<InventoryReport> {
        let products = self.data.store().find_all(None).await?;
        Ok(InventoryReport::from_products(&products, Utc::now()))
    }
}
