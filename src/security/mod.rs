//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → body size limit (tower-http, configured in http/server.rs)
//!     → rate_limit.rs (check per-IP limits)
//!     → Pass to handlers
//! ```
//!
//! # Design Decisions
//! - Reject early, before any store or cache work
//! - No trust in client-supplied forwarding headers

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiter};
