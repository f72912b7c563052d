//! Guarded operation dispatcher.
//!
//! # Responsibilities
//! - Serve reads from the cache before any breaker is consulted
//! - Resolve the breaker for an operation name, binding the product
//!   service on first reference
//! - Fire the breaker around the store work only, then populate or
//!   invalidate the cache
//! - Translate the breaker outcome into `CatalogError`
//!
//! # Design Decisions
//! - Cache lookups, population and invalidation are never breaker-protected
//! - Short-circuits become `ServiceUnavailable` here and nowhere else
//! - Domain and transient failures pass through unchanged
//! - Breaker options come from a per-operation policy, fixed at creation

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::catalog::{CacheAside, NewProduct, Product, ProductChanges, ProductService};
use crate::dispatch::operation::{Operation, OperationName, OperationOutput};
use crate::error::{CatalogError, CatalogResult, TransientFailure};
use crate::observability::metrics;
use crate::resilience::{BoundOperation, BreakerError, BreakerOptions, BreakerRegistry, BreakerSnapshot};

/// Registry type used by the catalog.
pub type CatalogRegistry = BreakerRegistry<Operation, OperationOutput, CatalogError>;

/// Breaker options per operation, with a shared default.
#[derive(Debug, Clone, Default)]
pub struct BreakerPolicy {
    default: BreakerOptions,
    overrides: HashMap<OperationName, BreakerOptions>,
}

impl BreakerPolicy {
    pub fn new(default: BreakerOptions) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, name: OperationName, options: BreakerOptions) -> Self {
        self.overrides.insert(name, options);
        self
    }

    pub fn options_for(&self, name: OperationName) -> BreakerOptions {
        self.overrides.get(&name).copied().unwrap_or(self.default)
    }
}

/// Entry point for the boundary layer.
#[derive(Clone)]
pub struct Dispatcher {
    service: ProductService,
    registry: Arc<CatalogRegistry>,
    policy: BreakerPolicy,
}

impl Dispatcher {
    pub fn new(service: ProductService, registry: Arc<CatalogRegistry>, policy: BreakerPolicy) -> Self {
        Self {
            service,
            registry,
            policy,
        }
    }

    /// Cache-aside access the dispatcher reads through.
    pub fn data(&self) -> &CacheAside {
        self.service.data()
    }

    pub fn registry(&self) -> &Arc<CatalogRegistry> {
        &self.registry
    }

    pub fn breaker_snapshots(&self) -> Vec<BreakerSnapshot> {
        self.registry.snapshots()
    }

    /// Run `operation`: reads go through the cache and only reach the
    /// breaker on a miss; mutations run under the breaker and invalidate
    /// afterwards.
    pub async fn invoke(&self, operation: Operation) -> CatalogResult<OperationOutput> {
        let data = self.service.data();
        match operation.cache_key() {
            Some(key) => data.read(&key, self.guarded(operation)).await,
            None => {
                let keys = operation.invalidates();
                data.write(&keys, self.guarded(operation)).await
            }
        }
    }

    /// Fire the breaker for `operation`.
    async fn guarded(&self, operation: Operation) -> CatalogResult<OperationOutput> {
        let name = operation.name();
        let breaker = self
            .registry
            .get_or_create(name.as_str(), self.policy.options_for(name), || self.bind());

        breaker.fire(operation).await.map_err(|e| match e {
            BreakerError::Open { operation } => {
                metrics::record_breaker_rejection(&operation);
                CatalogError::ServiceUnavailable { operation }
            }
            BreakerError::Timeout { operation, after } => {
                tracing::warn!(operation = %operation, timeout_ms = after.as_millis() as u64, "Operation timed out");
                TransientFailure::Timeout { operation, after }.into()
            }
            BreakerError::Operation(e) => e,
        })
    }

    pub async fn get_all_products(&self) -> CatalogResult<Vec<Product>> {
        self.invoke(Operation::GetAllProducts).await?.into_products()
    }

    pub async fn get_active_products(&self) -> CatalogResult<Vec<Product>> {
        self.invoke(Operation::GetActiveProducts).await?.into_products()
    }

    pub async fn get_product_by_id(&self, id: i64) -> CatalogResult<Product> {
        self.invoke(Operation::GetProductById { id }).await?.into_product()
    }

    pub async fn create_product(&self, input: NewProduct) -> CatalogResult<Product> {
        self.invoke(Operation::CreateProduct(input)).await?.into_product()
    }

    pub async fn update_product(&self, id: i64, changes: ProductChanges) -> CatalogResult<Product> {
        self.invoke(Operation::UpdateProduct { id, changes })
            .await?
            .into_product()
    }

    pub async fn toggle_activate(&self, id: i64) -> CatalogResult<Product> {
        self.invoke(Operation::ToggleActivate { id }).await?.into_product()
    }

    fn bind(&self) -> BoundOperation<Operation, OperationOutput, CatalogError> {
        let service = self.service.clone();
        Arc::new(move |operation| {
            let service = service.clone();
            async move { execute(&service, operation).await }.boxed()
        })
    }
}

async fn execute(service: &ProductService, operation: Operation) -> CatalogResult<OperationOutput> {
    match operation {
        Operation::GetAllProducts => service.get_all_products().await.map(OperationOutput::Products),
        Operation::GetActiveProducts => service
            .get_active_products()
            .await
            .map(OperationOutput::Products),
        Operation::GetProductById { id } => service
            .get_product_by_id(id)
            .await
            .map(OperationOutput::Product),
        Operation::ToggleActivate { id } => service
            .toggle_activate(id)
            .await
            .map(OperationOutput::Product),
        Operation::UpdateProduct { id, changes } => service
            .update_product(id, changes)
            .await
            .map(OperationOutput::Product),
        Operation::CreateProduct(input) => service
            .create_product(input)
            .await
            .map(OperationOutput::Product),
    }
}
