//! Retry policy implementation
//!
//! Semantics:
//! - `max_attempts` counts total attempts (initial try + retries). Zero is allowed and means
//!   the operation is never invoked: the policy answers `ResilienceError::NotAttempted`.
//! - The `retry_on` predicate decides whether a failure is retryable; a failure it rejects is
//!   returned at once, without sleeping. The default retries everything.
//! - After the failed attempt `n` (0-based) the policy sleeps `backoff.delay(n + 1)`, which for
//!   the default exponential backoff is `base_delay * backoff_factor^n`, then applies jitter.
//! - When every attempt failed, the last error is returned unchanged.
//! - The sleeper controls how delays are applied (production uses `TokioSleeper`; tests inject
//!   `InstantSleeper`/`TrackingSleeper`).
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use kitchen_resilience::{PolicyExt, ResilienceError, RetryPolicy};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let policy = RetryPolicy::<String>::builder()
//!     .max_attempts(3) // total attempts
//!     .base_delay(Duration::from_millis(10))
//!     .backoff_factor(2.0)
//!     .jitter(false)
//!     .retry_on(|e| e.is_inner())
//!     .build()
//!     .unwrap();
//! let result: Result<(), ResilienceError<String>> =
//!     policy.run(|| async { Err(ResilienceError::Inner("stove offline".to_string())) }).await;
//! assert_eq!(result.unwrap_err().to_string(), "stove offline");
//! # });
//! ```

use crate::algebra::Composite;
use crate::backoff::BackoffError;
use crate::{Backoff, Jitter, Operation, Policy, ResilienceError, Sleeper, TokioSleeper};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type RetryPredicate<E> = dyn Fn(&ResilienceError<E>) -> bool + Send + Sync;

/// Retry policy combining backoff, jitter, predicate, and sleeper.
pub struct RetryPolicy<E> {
    max_attempts: usize,
    backoff: Backoff,
    jitter: Jitter,
    retry_on: Arc<RetryPredicate<E>>,
    sleeper: Arc<dyn Sleeper>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff.clone(),
            jitter: self.jitter,
            retry_on: Arc::clone(&self.retry_on),
            sleeper: Arc::clone(&self.sleeper),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("jitter", &self.jitter)
            .field("sleeper", &self.sleeper)
            .field("retry_on", &"<predicate>")
            .finish()
    }
}

impl<E> RetryPolicy<E> {
    /// Construct a new builder with defaults.
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::new()
    }

    /// Exponential backoff, retry-everything policy from statically valid parameters.
    pub(crate) fn from_parts(
        max_attempts: usize,
        base_delay: Duration,
        backoff_factor: f64,
        jitter: bool,
    ) -> Self {
        let backoff = Backoff::exponential(base_delay);
        let backoff = match backoff.clone().with_factor(backoff_factor) {
            Ok(b) => b,
            Err(err) => {
                debug_assert!(false, "invalid backoff factor {}: {}", backoff_factor, err);
                tracing::error!(
                    policy = "retry",
                    backoff_factor,
                    error = %err,
                    "invalid backoff factor; using the default factor"
                );
                backoff
            }
        };
        Self {
            max_attempts,
            backoff,
            jitter: Jitter::enabled(jitter),
            retry_on: Arc::new(|_| true),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn jitter(&self) -> Jitter {
        self.jitter
    }

    /// Delay slept after the failed attempt `attempt` (0-based), before jitter.
    pub fn delay_after(&self, attempt: usize) -> Duration {
        self.backoff.delay(attempt.saturating_add(1))
    }
}

#[async_trait]
impl<T, E> Policy<T, E> for RetryPolicy<E>
where
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    async fn execute(&self, operation: Operation<T, E>) -> Result<T, ResilienceError<E>> {
        if self.max_attempts == 0 {
            return Err(ResilienceError::NotAttempted);
        }

        let mut attempt = 0;
        loop {
            let err = match operation.call().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !(self.retry_on)(&err) || attempt + 1 >= self.max_attempts {
                return Err(err);
            }

            let delay = self.jitter.apply(self.delay_after(attempt));
            tracing::warn!(
                policy = "retry",
                attempt = attempt + 1,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed; retrying"
            );
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }

    fn name(&self) -> &'static str {
        "retry"
    }
}

impl<T, E> From<RetryPolicy<E>> for Composite<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    fn from(policy: RetryPolicy<E>) -> Self {
        Composite::single(policy)
    }
}

/// Errors produced while building a retry policy.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("base_delay must be finite (got {0:?})")]
    InvalidBaseDelay(Duration),
    #[error(transparent)]
    Backoff(#[from] BackoffError),
}

/// Builder for `RetryPolicy`.
pub struct RetryPolicyBuilder<E> {
    max_attempts: usize,
    base_delay: Duration,
    backoff_factor: f64,
    backoff: Option<Backoff>,
    jitter: Jitter,
    retry_on: Arc<RetryPredicate<E>>,
    sleeper: Arc<dyn Sleeper>,
}

impl<E> RetryPolicyBuilder<E> {
    /// Defaults: 3 attempts, 1s base delay doubling per retry, proportional jitter, retry
    /// every failure.
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            backoff: None,
            jitter: Jitter::Proportional,
            retry_on: Arc::new(|_| true),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Set total attempts (initial + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Delay after the first failed attempt.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Multiplier applied per further retry; must be finite and `>= 1.0`.
    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Use an explicit backoff strategy instead of `base_delay`/`backoff_factor`.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Enable (`Jitter::Proportional`) or disable jitter.
    pub fn jitter(mut self, on: bool) -> Self {
        self.jitter = Jitter::enabled(on);
        self
    }

    /// Set jitter strategy.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Predicate deciding whether a failure is retried.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ResilienceError<E>) -> bool + Send + Sync + 'static,
    {
        self.retry_on = Arc::new(predicate);
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Build the retry policy, validating inputs.
    pub fn build(self) -> Result<RetryPolicy<E>, BuildError> {
        let backoff = match self.backoff {
            Some(backoff) => backoff,
            None => {
                if self.base_delay == Duration::MAX {
                    return Err(BuildError::InvalidBaseDelay(self.base_delay));
                }
                Backoff::exponential(self.base_delay).with_factor(self.backoff_factor)?
            }
        };
        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            backoff,
            jitter: self.jitter,
            retry_on: self.retry_on,
            sleeper: self.sleeper,
        })
    }
}

impl<E> Default for RetryPolicyBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
