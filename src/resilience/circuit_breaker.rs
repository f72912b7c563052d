//! Circuit breaker for data-access protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: operation assumed broken, calls fail fast
//! - Half-Open: a single probe tests whether it recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive counted failures >= failure_threshold
//! Open → Half-Open: first call at or after next_attempt_at
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails (next_attempt_at restarts)
//! ```
//!
//! # Design Decisions
//! - Per-operation circuit breaker (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - Single probe in Half-Open (prevents hammering a recovering store)
//! - State is guarded by a mutex that is never held across an await

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::resilience::timeouts::with_deadline;
use crate::resilience::FailureClass;

/// Future produced by a bound operation.
pub type OperationFuture<T, E> = BoxFuture<'static, Result<T, E>>;

/// The operation a breaker protects. Bound once, when the breaker is created.
pub type BoundOperation<A, T, E> = Arc<dyn Fn(A) -> OperationFuture<T, E> + Send + Sync>;

/// Observer for state transitions: `(operation, from, to)`.
pub type StateListener = Arc<dyn Fn(&str, CircuitState, CircuitState) + Send + Sync>;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge encoding used for metrics.
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        };
        f.write_str(s)
    }
}

/// Static per-operation breaker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerOptions {
    /// Deadline for a single invocation.
    pub timeout: Duration,
    /// Consecutive counted failures that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a probe is allowed.
    pub reset_timeout: Duration,
}

impl Default for BreakerOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(3000),
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

/// Errors returned by [`CircuitBreaker::fire`].
#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    /// Short-circuited; the operation was not invoked.
    #[error("circuit open for {operation}")]
    Open { operation: String },

    /// The operation did not finish within its deadline.
    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout { operation: String, after: Duration },

    /// The operation ran and failed.
    #[error(transparent)]
    Operation(E),
}

impl<E: FailureClass> BreakerError<E> {
    /// Whether this outcome counts against breaker health.
    pub fn counts_as_failure(&self) -> bool {
        match self {
            BreakerError::Open { .. } => false,
            BreakerError::Timeout { .. } => true,
            BreakerError::Operation(e) => !e.is_client_error(),
        }
    }
}

/// Point-in-time view of a breaker, for monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub operation: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    /// Seconds until a probe is allowed, rounded up (Open only).
    pub retry_in_secs: Option<u64>,
}

#[derive(Debug)]
struct BreakerCore {
    state: CircuitState,
    failure_count: u32,
    next_attempt_at: Option<Instant>,
    probe_in_flight: bool,
}

/// How a call was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Probe,
}

/// A named circuit breaker bound to one operation.
pub struct CircuitBreaker<A, T, E> {
    name: String,
    options: BreakerOptions,
    core: Mutex<BreakerCore>,
    operation: BoundOperation<A, T, E>,
    listeners: Vec<StateListener>,
}

impl<A, T, E> fmt::Debug for CircuitBreaker<A, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<A, T, E> CircuitBreaker<A, T, E>
where
    E: FailureClass,
{
    /// Create a breaker in the Closed state.
    pub fn new(
        name: impl Into<String>,
        options: BreakerOptions,
        operation: BoundOperation<A, T, E>,
        listeners: Vec<StateListener>,
    ) -> Self {
        let name = name.into();
        tracing::debug!(
            operation = %name,
            failure_threshold = options.failure_threshold,
            reset_timeout_ms = options.reset_timeout.as_millis() as u64,
            timeout_ms = options.timeout.as_millis() as u64,
            "Circuit breaker created"
        );

        Self {
            name,
            options,
            core: Mutex::new(BreakerCore {
                state: CircuitState::Closed,
                failure_count: 0,
                next_attempt_at: None,
                probe_in_flight: false,
            }),
            operation,
            listeners,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> BreakerOptions {
        self.options
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let core = self.lock();
        let retry_in_secs = match (core.state, core.next_attempt_at) {
            (CircuitState::Open, Some(at)) => {
                let remaining = at.saturating_duration_since(Instant::now());
                Some(remaining.as_millis().div_ceil(1000) as u64)
            }
            _ => None,
        };
        BreakerSnapshot {
            operation: self.name.clone(),
            state: core.state,
            failure_count: core.failure_count,
            failure_threshold: self.options.failure_threshold,
            retry_in_secs,
        }
    }

    /// Invoke the bound operation under breaker protection.
    pub async fn fire(&self, args: A) -> Result<T, BreakerError<E>> {
        let admission = self.admit()?;
        let mut permit = Permit {
            breaker: self,
            admission,
            settled: false,
        };

        let result = match with_deadline(self.options.timeout, (self.operation)(args)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(BreakerError::Operation(e)),
            Err(elapsed) => Err(BreakerError::Timeout {
                operation: self.name.clone(),
                after: elapsed.after,
            }),
        };

        let failed = match &result {
            Ok(_) => false,
            Err(e) => e.counts_as_failure(),
        };
        permit.settle(failed);

        result
    }

    fn lock(&self) -> MutexGuard<'_, BreakerCore> {
        self.core.lock().expect("circuit breaker mutex poisoned")
    }

    /// Decide whether a call may run. Performs Open → Half-Open when due.
    fn admit(&self) -> Result<Admission, BreakerError<E>> {
        let now = Instant::now();
        let mut core = self.lock();

        match core.state {
            CircuitState::Closed => Ok(Admission::Normal),
            CircuitState::Open => {
                let due = core.next_attempt_at.map_or(true, |at| now >= at);
                if !due {
                    drop(core);
                    return Err(self.rejected());
                }
                core.state = CircuitState::HalfOpen;
                core.probe_in_flight = true;
                drop(core);

                tracing::info!(operation = %self.name, "Circuit breaker half-open, probing");
                self.notify(CircuitState::Open, CircuitState::HalfOpen);
                Ok(Admission::Probe)
            }
            CircuitState::HalfOpen => {
                if core.probe_in_flight {
                    drop(core);
                    return Err(self.rejected());
                }
                core.probe_in_flight = true;
                Ok(Admission::Probe)
            }
        }
    }

    fn rejected(&self) -> BreakerError<E> {
        tracing::debug!(operation = %self.name, "Circuit open, call rejected");
        BreakerError::Open {
            operation: self.name.clone(),
        }
    }

    /// Apply a call outcome to the state machine.
    fn record(&self, admission: Admission, failed: bool) {
        let mut core = self.lock();
        let from = core.state;

        match admission {
            Admission::Probe => {
                core.probe_in_flight = false;
                if failed {
                    self.trip(&mut core);
                } else {
                    core.state = CircuitState::Closed;
                    core.failure_count = 0;
                    core.next_attempt_at = None;
                }
            }
            Admission::Normal => {
                // Outcomes of calls admitted before the circuit left Closed
                // are stale once it has; they must not disturb the newer state.
                if core.state == CircuitState::Closed {
                    if failed {
                        core.failure_count += 1;
                        if core.failure_count >= self.options.failure_threshold {
                            self.trip(&mut core);
                        }
                    } else {
                        core.failure_count = 0;
                    }
                }
            }
        }

        let to = core.state;
        let failure_count = core.failure_count;
        drop(core);

        if from != to {
            match to {
                CircuitState::Open => tracing::warn!(
                    operation = %self.name,
                    failure_count,
                    reset_timeout_ms = self.options.reset_timeout.as_millis() as u64,
                    "Circuit breaker opened"
                ),
                _ => tracing::info!(operation = %self.name, "Circuit breaker closed"),
            }
            self.notify(from, to);
        }
    }

    fn trip(&self, core: &mut BreakerCore) {
        core.state = CircuitState::Open;
        core.next_attempt_at = Some(Instant::now() + self.options.reset_timeout);
    }

    fn notify(&self, from: CircuitState, to: CircuitState) {
        for listener in &self.listeners {
            listener(&self.name, from, to);
        }
    }
}

/// Tracks an admitted call until its outcome is recorded.
///
/// A probe dropped before completion (caller went away) reopens the circuit
/// so the Half-Open slot is not held forever.
struct Permit<'a, A, T, E: FailureClass> {
    breaker: &'a CircuitBreaker<A, T, E>,
    admission: Admission,
    settled: bool,
}

impl<A, T, E: FailureClass> Permit<'_, A, T, E> {
    fn settle(&mut self, failed: bool) {
        self.settled = true;
        self.breaker.record(self.admission, failed);
    }
}

impl<A, T, E: FailureClass> Drop for Permit<'_, A, T, E> {
    fn drop(&mut self) {
        if !self.settled && self.admission == Admission::Probe {
            self.breaker.record(Admission::Probe, true);
        }
    }
}
