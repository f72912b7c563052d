//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or defaults
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (CATALOG_BIND_ADDRESS, PORT, CATALOG_LOG_LEVEL)
//!     → validation.rs (semantic checks)
//!     → CatalogConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{default_config, load_config, ConfigError};
pub use schema::{
    AdminConfig, BreakerConfig, CatalogConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig,
    StoreConfig,
};
