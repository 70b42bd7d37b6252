//! Timeout policy implementation
//!
//! The operation runs on the shared [`worker`](crate::worker) pool; the caller waits on the
//! join handle for at most the configured duration. When the wait expires the caller gets
//! `ResilienceError::Timeout` and the worker task is aborted. Aborting drops an async
//! operation at its next suspension point, but blocking work (for example an
//! [`Operation::blocking`](crate::Operation::blocking) closure) cannot be preempted and
//! keeps running in the background until it finishes on its own. Slots of enclosing
//! bulkheads travel with the worker task, so such work still counts against them.

use crate::algebra::Composite;
use crate::error::panic_message;
use crate::slots::HeldSlots;
use crate::{worker, Operation, Policy, ResilienceError};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Errors produced while building a timeout policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutError {
    #[error("timeout duration must be greater than zero")]
    Zero,
    #[error("timeout duration must be finite (got {0:?})")]
    Unbounded(Duration),
}

/// Bounds how long a caller waits for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    duration: Duration,
}

impl TimeoutPolicy {
    /// Create a timeout policy; rejects zero and `Duration::MAX`.
    pub fn new(duration: Duration) -> Result<Self, TimeoutError> {
        if duration.is_zero() {
            return Err(TimeoutError::Zero);
        }
        if duration == Duration::MAX {
            return Err(TimeoutError::Unbounded(duration));
        }
        Ok(Self { duration })
    }

    /// Convenience for fractional seconds; rejects non-positive and non-finite values.
    pub fn from_secs_f64(secs: f64) -> Result<Self, TimeoutError> {
        if !(secs > 0.0) {
            return Err(TimeoutError::Zero);
        }
        match Duration::try_from_secs_f64(secs) {
            Ok(d) => Self::new(d),
            Err(_) => Err(TimeoutError::Unbounded(Duration::MAX)),
        }
    }

    pub(crate) const fn from_duration_unchecked(duration: Duration) -> Self {
        Self { duration }
    }

    /// Inspect the configured timeout duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

#[async_trait]
impl<T, E> Policy<T, E> for TimeoutPolicy
where
    T: Send + 'static,
    E: Send + 'static,
{
    async fn execute(&self, operation: Operation<T, E>) -> Result<T, ResilienceError<E>> {
        let start = Instant::now();
        let mut task = worker::spawn(HeldSlots::current().scope(operation.call()));

        match tokio::time::timeout(self.duration, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) if join.is_panic() => {
                Err(ResilienceError::Panicked(panic_message(join.into_panic().as_ref())))
            }
            Ok(Err(join)) => Err(ResilienceError::Panicked(join.to_string())),
            Err(_) => {
                task.abort();
                let elapsed = start.elapsed();
                tracing::debug!(
                    policy = "timeout",
                    timeout_ms = self.duration.as_millis() as u64,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "operation timed out; worker task aborted"
                );
                Err(ResilienceError::Timeout { elapsed, timeout: self.duration })
            }
        }
    }

    fn name(&self) -> &'static str {
        "timeout"
    }
}

impl<T, E> From<TimeoutPolicy> for Composite<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn from(policy: TimeoutPolicy) -> Self {
        Composite::single(policy)
    }
}
