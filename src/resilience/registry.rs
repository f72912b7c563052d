//! Breaker registry.
//!
//! # Responsibilities
//! - Map operation names to their breakers
//! - Create a breaker on first reference, binding its operation and options
//! - Hand out the same instance to every later caller
//!
//! # Design Decisions
//! - Explicit object owned by the dispatcher, not a global
//! - Insert-if-absent runs under the DashMap shard lock, so concurrent
//!   first callers cannot create two breakers for one name
//! - Options are fixed at creation; there is no runtime reconfiguration

use std::sync::Arc;

use dashmap::DashMap;

use crate::resilience::circuit_breaker::{
    BoundOperation, BreakerOptions, BreakerSnapshot, CircuitBreaker, StateListener,
};
use crate::resilience::FailureClass;

/// Process-wide collection of per-operation circuit breakers.
pub struct BreakerRegistry<A, T, E> {
    breakers: DashMap<String, Arc<CircuitBreaker<A, T, E>>>,
    listeners: Vec<StateListener>,
}

impl<A, T, E> Default for BreakerRegistry<A, T, E> {
    fn default() -> Self {
        Self {
            breakers: DashMap::new(),
            listeners: Vec::new(),
        }
    }
}

impl<A, T, E> BreakerRegistry<A, T, E>
where
    E: FailureClass,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a state-change listener to every breaker created afterwards.
    pub fn with_listener(mut self, listener: StateListener) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Return the breaker for `name`, creating it on first reference.
    ///
    /// `bind` is only called when the breaker does not exist yet.
    pub fn get_or_create<F>(
        &self,
        name: &str,
        options: BreakerOptions,
        bind: F,
    ) -> Arc<CircuitBreaker<A, T, E>>
    where
        F: FnOnce() -> BoundOperation<A, T, E>,
    {
        if let Some(existing) = self.breakers.get(name) {
            return existing.value().clone();
        }

        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    name,
                    options,
                    bind(),
                    self.listeners.clone(),
                ))
            })
            .value()
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker<A, T, E>>> {
        self.breakers.get(name).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Snapshots of every breaker, sorted by operation name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut all: Vec<BreakerSnapshot> = self
            .breakers
            .iter()
            .map(|r| r.value().snapshot())
            .collect();
        all.sort_by(|a, b| a.operation.cmp(&b.operation));
        all
    }
}
