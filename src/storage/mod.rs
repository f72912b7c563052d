//! Storage collaborators.
//!
//! # Data Flow
//! ```text
//! Cache-aside data access
//!     → cache.rs (key/value with expiry, never authoritative)
//!     → store.rs (transactional product records, authoritative)
//! ```
//!
//! # Design Decisions
//! - Both collaborators are traits so the service can be wired to other
//!   backends; in-memory implementations ship for standalone use and tests
//! - A cache miss is `Ok(None)`, never an error
//! - Store reads and writes accept an optional transaction handle

pub mod cache;
pub mod store;

pub use cache::{CacheError, CacheStore, MemoryCache};
pub use store::{MemoryStore, ProductStore, StoreError, TxHandle};
