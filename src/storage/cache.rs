//! Cache store with per-entry expiry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::time::Instant;

/// Errors from a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable")]
    Unavailable,

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Key/value cache with expiry. Values are serialized strings.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up `key`. Absent or expired entries yield `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct CachedValue {
    value: String,
    expires_at: Instant,
}

/// A thread-safe in-process cache.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, CachedValue>>,
    available: Arc<AtomicBool>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate the cache going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// True if a live entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .get(key)
            .map(|r| r.value().expires_at > Instant::now())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, v| v.expires_at > now);
        before - self.inner.len()
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable)
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check()?;
        let now = Instant::now();

        let hit = match self.inner.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => None,
            None => return Ok(None),
        };

        if hit.is_none() {
            self.inner.remove_if(key, |_, v| v.expires_at <= now);
        }
        Ok(hit)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.inner.insert(
            key.to_string(),
            CachedValue {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.check()?;
        self.inner.remove(key);
        Ok(())
    }
}
