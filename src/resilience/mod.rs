//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher invokes an operation:
//!     → registry.rs (resolve the breaker bound to the operation name)
//!     → circuit_breaker.rs (admit, short-circuit, or probe)
//!     → timeouts.rs (enforce the per-operation deadline)
//!     → outcome classified and recorded against the breaker
//! ```
//!
//! # Design Decisions
//! - One breaker per operation name, created lazily, never torn down
//! - Client errors propagate but are not counted as failures
//! - Timeouts are counted as failures
//! - The breaker never retries

pub mod circuit_breaker;
pub mod registry;
pub mod timeouts;

pub use circuit_breaker::{
    BoundOperation, BreakerError, BreakerOptions, BreakerSnapshot, CircuitBreaker, CircuitState,
    OperationFuture, StateListener,
};
pub use registry::BreakerRegistry;

/// Classifies an operation failure for breaker accounting.
pub trait FailureClass {
    /// True when the failure is the caller's fault (4xx equivalent).
    /// Client errors are returned to the caller but never trip a breaker.
    fn is_client_error(&self) -> bool;
}
