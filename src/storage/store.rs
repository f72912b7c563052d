//! Persistent product store.
//!
//! # Responsibilities
//! - Own the authoritative product records
//! - Generate immutable ids on create
//! - Provide begin/commit/rollback with read-your-writes inside a transaction
//! - Stamp `created_at` / `updated_at` on every write
//!
//! # Design Decisions
//! - Writes inside a transaction are staged and only become visible on commit
//! - Writes without a transaction auto-commit
//! - Ids are never reused, even when the creating transaction rolls back

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::catalog::product::{NewProduct, Product, ProductChanges};

/// Errors from the persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable")]
    Unavailable,

    #[error("unknown transaction {0}")]
    UnknownTransaction(u64),

    #[error("query failed: {0}")]
    Query(String),
}

/// Handle to an open store transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHandle(u64);

impl TxHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Durable, transactional product storage.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn begin(&self) -> Result<TxHandle, StoreError>;
    async fn commit(&self, tx: TxHandle) -> Result<(), StoreError>;
    async fn rollback(&self, tx: TxHandle) -> Result<(), StoreError>;

    async fn create(&self, input: NewProduct, tx: Option<TxHandle>) -> Result<Product, StoreError>;
    async fn find_by_id(&self, id: i64, tx: Option<TxHandle>) -> Result<Option<Product>, StoreError>;
    /// All products ordered by id.
    async fn find_all(&self, tx: Option<TxHandle>) -> Result<Vec<Product>, StoreError>;
    /// Apply `changes`; `Ok(None)` when `id` does not exist.
    async fn update(
        &self,
        id: i64,
        changes: ProductChanges,
        tx: Option<TxHandle>,
    ) -> Result<Option<Product>, StoreError>;
    /// Remove a product; `Ok(false)` when `id` does not exist.
    async fn delete(&self, id: i64, tx: Option<TxHandle>) -> Result<bool, StoreError>;
}

/// Staged writes of one transaction. `None` marks a deletion.
type Staged = BTreeMap<i64, Option<Product>>;

#[derive(Debug, Default)]
struct StoreState {
    rows: BTreeMap<i64, Product>,
    next_id: i64,
    pending: HashMap<u64, Staged>,
}

impl StoreState {
    fn staged(&mut self, tx: TxHandle) -> Result<&mut Staged, StoreError> {
        self.pending
            .get_mut(&tx.0)
            .ok_or(StoreError::UnknownTransaction(tx.0))
    }

    fn read(&self, id: i64, tx: Option<TxHandle>) -> Result<Option<Product>, StoreError> {
        if let Some(tx) = tx {
            let staged = self
                .pending
                .get(&tx.0)
                .ok_or(StoreError::UnknownTransaction(tx.0))?;
            if let Some(entry) = staged.get(&id) {
                return Ok(entry.clone());
            }
        }
        Ok(self.rows.get(&id).cloned())
    }

    fn write(&mut self, id: i64, entry: Option<Product>, tx: Option<TxHandle>) -> Result<(), StoreError> {
        match (tx, entry) {
            (Some(tx), entry) => {
                self.staged(tx)?.insert(id, entry);
            }
            (None, Some(product)) => {
                self.rows.insert(id, product);
            }
            (None, None) => {
                self.rows.remove(&id);
            }
        }
        Ok(())
    }
}

/// In-memory transactional store.
///
/// Availability and latency can be adjusted at runtime to exercise the
/// resilience layer.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    next_tx: AtomicU64,
    available: AtomicBool,
    latency_ms: AtomicU64,
    reads: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                next_id: 1,
                ..StoreState::default()
            }),
            next_tx: AtomicU64::new(1),
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
            reads: AtomicUsize::new(0),
        }
    }

    /// Create a store pre-populated with `products` (ids assigned in order).
    pub fn with_products(products: impl IntoIterator<Item = NewProduct>) -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            for input in products {
                let id = state.next_id;
                state.next_id += 1;
                state.rows.insert(id, materialize(id, input));
            }
        }
        store
    }

    /// Create a store holding existing records verbatim, ids and
    /// timestamps included. New ids continue after the highest one.
    pub fn with_records(records: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            for product in records {
                state.next_id = state.next_id.max(product.id + 1);
                state.rows.insert(product.id, product);
            }
        }
        store
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of `find_by_id` / `find_all` calls attempted.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of transactions currently open.
    pub fn open_transactions(&self) -> usize {
        self.lock().pending.len()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("memory store mutex poisoned")
    }

    async fn ready(&self) -> Result<(), StoreError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

fn materialize(id: i64, input: NewProduct) -> Product {
    let now = Utc::now();
    Product {
        id,
        name: input.name.trim().to_string(),
        price: input.price,
        activate: input.activate,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn begin(&self) -> Result<TxHandle, StoreError> {
        self.ready().await?;
        let id = self.next_tx.fetch_add(1, Ordering::SeqCst);
        self.lock().pending.insert(id, BTreeMap::new());
        Ok(TxHandle(id))
    }

    async fn commit(&self, tx: TxHandle) -> Result<(), StoreError> {
        self.ready().await?;
        let mut state = self.lock();
        let staged = state
            .pending
            .remove(&tx.0)
            .ok_or(StoreError::UnknownTransaction(tx.0))?;
        for (id, entry) in staged {
            state.write(id, entry, None)?;
        }
        Ok(())
    }

    async fn rollback(&self, tx: TxHandle) -> Result<(), StoreError> {
        // Rollback must succeed even while the store is degraded, or
        // staged writes would leak.
        self.lock()
            .pending
            .remove(&tx.0)
            .map(|_| ())
            .ok_or(StoreError::UnknownTransaction(tx.0))
    }

    async fn create(&self, input: NewProduct, tx: Option<TxHandle>) -> Result<Product, StoreError> {
        self.ready().await?;
        let mut state = self.lock();
        if let Some(tx) = tx {
            state.staged(tx)?;
        }
        let id = state.next_id;
        state.next_id += 1;
        let product = materialize(id, input);
        state.write(id, Some(product.clone()), tx)?;
        Ok(product)
    }

    async fn find_by_id(&self, id: i64, tx: Option<TxHandle>) -> Result<Option<Product>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.ready().await?;
        self.lock().read(id, tx)
    }

    async fn find_all(&self, tx: Option<TxHandle>) -> Result<Vec<Product>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.ready().await?;
        let state = self.lock();
        let mut merged = state.rows.clone();
        if let Some(tx) = tx {
            let staged = state
                .pending
                .get(&tx.0)
                .ok_or(StoreError::UnknownTransaction(tx.0))?;
            for (id, entry) in staged {
                match entry {
                    Some(product) => merged.insert(*id, product.clone()),
                    None => merged.remove(id),
                };
            }
        }
        Ok(merged.into_values().collect())
    }

    async fn update(
        &self,
        id: i64,
        changes: ProductChanges,
        tx: Option<TxHandle>,
    ) -> Result<Option<Product>, StoreError> {
        self.ready().await?;
        let mut state = self.lock();
        let Some(mut product) = state.read(id, tx)? else {
            return Ok(None);
        };
        changes.apply(&mut product);
        product.updated_at = Utc::now();
        state.write(id, Some(product.clone()), tx)?;
        Ok(Some(product))
    }

    async fn delete(&self, id: i64, tx: Option<TxHandle>) -> Result<bool, StoreError> {
        self.ready().await?;
        let mut state = self.lock();
        if state.read(id, tx)?.is_none() {
            return Ok(false);
        }
        state.write(id, None, tx)?;
        Ok(true)
    }
}
