//! Guarded operation dispatch.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → dispatcher.rs invoke(Operation)
//!     → read: cache hit? return
//!     → registry: breaker for Operation::name()
//!     → breaker.fire → ProductService store work (bound on first use)
//!     → populate (read) or invalidate (mutation)
//!     → OperationOutput | CatalogError
//! ```

pub mod dispatcher;
pub mod operation;

pub use dispatcher::{BreakerPolicy, CatalogRegistry, Dispatcher};
pub use operation::{Operation, OperationName, OperationOutput};
