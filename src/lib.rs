//! Product catalog service library.
//!
//! A product catalog over HTTP whose data access is protected by
//! per-operation circuit breakers and a read-through cache.

pub mod admin;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod storage;

pub use config::schema::CatalogConfig;
pub use dispatch::Dispatcher;
pub use error::{CatalogError, CatalogResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
