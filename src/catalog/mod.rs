//! Product catalog data access.
//!
//! # Data Flow
//! ```text
//! Read:  cache_aside.rs lookup → hit? return : guarded service.rs fetch → populate
//! Write: guarded service.rs (validate → transaction → commit) → invalidate keys.rs
//! Admin: maintenance.rs → transaction → invalidate keys.rs
//! ```

pub mod cache_aside;
pub mod keys;
pub mod maintenance;
pub mod product;
pub mod service;

pub use cache_aside::CacheAside;
pub use maintenance::{InventoryReport, Maintenance};
pub use product::{NewProduct, Product, ProductChanges};
pub use service::ProductService;
