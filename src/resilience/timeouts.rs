//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap protected operations with a deadline
//! - Report expiry as a distinct error carrying the deadline
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Expiry releases the caller; the wrapped future is dropped, which does
//!   not undo work a store has already started

use std::future::Future;
use std::time::Duration;

/// The deadline elapsed before the operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded {
    pub after: Duration,
}

impl std::fmt::Display for DeadlineExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "deadline of {}ms exceeded", self.after.as_millis())
    }
}

impl std::error::Error for DeadlineExceeded {}

/// Run `future` with a deadline.
pub async fn with_deadline<F>(after: Duration, future: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    tokio::time::timeout(after, future)
        .await
        .map_err(|_| DeadlineExceeded { after })
}
