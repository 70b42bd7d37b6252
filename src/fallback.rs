//! Fallback policy: graceful degradation on failure.
//!
//! On success the value passes through untouched. On failure the policy tries, in order:
//!
//! 1. the fallback function, called with the original error; its own `Err` is propagated;
//! 2. the fallback value, cloned for every failure;
//! 3. nothing: the original error is returned unchanged.
//!
//! ```rust
//! use kitchen_resilience::{FallbackPolicy, PolicyExt, ResilienceError};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let policy = FallbackPolicy::<u32, String>::value(0).log_error(false);
//! let stock = policy
//!     .run(|| async { Err(ResilienceError::Inner("pantry offline".to_string())) })
//!     .await;
//! assert_eq!(stock, Ok(0));
//! # });
//! ```

use crate::algebra::Composite;
use crate::{Operation, Policy, ResilienceError};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

type FallbackFn<T, E> =
    dyn Fn(ResilienceError<E>) -> Result<T, ResilienceError<E>> + Send + Sync;

/// Substitutes a value, or a computed value, when the operation fails.
pub struct FallbackPolicy<T, E> {
    value: Option<T>,
    fallback_fn: Option<Arc<FallbackFn<T, E>>>,
    log_error: bool,
}

impl<T: Clone, E> Clone for FallbackPolicy<T, E> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            fallback_fn: self.fallback_fn.clone(),
            log_error: self.log_error,
        }
    }
}

impl<T: fmt::Debug, E> fmt::Debug for FallbackPolicy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackPolicy")
            .field("value", &self.value)
            .field("fallback_fn", &self.fallback_fn.as_ref().map(|_| "<fn>"))
            .field("log_error", &self.log_error)
            .finish()
    }
}

impl<T, E> FallbackPolicy<T, E> {
    /// No value and no function: failures pass through (still logged unless silenced).
    pub fn none() -> Self {
        Self { value: None, fallback_fn: None, log_error: true }
    }

    /// Answer `Ok(value)` on any failure.
    pub fn value(value: T) -> Self {
        Self { value: Some(value), ..Self::none() }
    }

    /// Compute the replacement from the error.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(ResilienceError<E>) -> Result<T, ResilienceError<E>> + Send + Sync + 'static,
    {
        Self::none().with_fn(f)
    }

    /// Set the fallback value; `None` clears it.
    pub fn with_value(mut self, value: Option<T>) -> Self {
        self.value = value;
        self
    }

    /// Set the fallback function; it wins over the fallback value.
    pub fn with_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(ResilienceError<E>) -> Result<T, ResilienceError<E>> + Send + Sync + 'static,
    {
        self.fallback_fn = Some(Arc::new(f));
        self
    }

    /// Log the original error at `warn` before falling back (default `true`).
    pub fn log_error(mut self, on: bool) -> Self {
        self.log_error = on;
        self
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback_fn.is_some() || self.value.is_some()
    }
}

impl<T: Default, E> FallbackPolicy<T, E> {
    /// Answer `T::default()` on any failure.
    pub fn default_value() -> Self {
        Self::value(T::default())
    }
}

#[async_trait]
impl<T, E> Policy<T, E> for FallbackPolicy<T, E>
where
    T: Clone + fmt::Debug + Send + Sync + 'static,
    E: fmt::Display + Send + 'static,
{
    async fn execute(&self, operation: Operation<T, E>) -> Result<T, ResilienceError<E>> {
        let err = match operation.call().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if self.log_error {
            tracing::warn!(
                policy = "fallback",
                error = %err,
                substituted = self.has_fallback(),
                "operation failed; applying fallback"
            );
        }

        if let Some(f) = &self.fallback_fn {
            return f(err);
        }
        match &self.value {
            Some(value) => Ok(value.clone()),
            None => Err(err),
        }
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}

impl<T, E> From<FallbackPolicy<T, E>> for Composite<T, E>
where
    T: Clone + fmt::Debug + Send + Sync + 'static,
    E: fmt::Display + Send + 'static,
{
    fn from(policy: FallbackPolicy<T, E>) -> Self {
        Composite::single(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn failing() -> Result<u32, ResilienceError<String>> {
        Err(ResilienceError::Inner("pantry offline".into()))
    }

    #[tokio::test]
    async fn success_passes_through() {
        let policy = FallbackPolicy::<u32, String>::value(0);
        let result = policy.run(|| async { Ok(12) }).await;
        assert_eq!(result, Ok(12));
    }

    #[tokio::test]
    async fn value_replaces_failure() {
        let policy = FallbackPolicy::<u32, String>::value(0);
        assert_eq!(policy.run(|| async { failing() }).await, Ok(0));
    }

    #[tokio::test]
    async fn fn_wins_over_value() {
        let policy = FallbackPolicy::<u32, String>::value(0).with_fn(|_| Ok(99));
        assert_eq!(policy.run(|| async { failing() }).await, Ok(99));
    }

    #[tokio::test]
    async fn fn_receives_original_error() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let sink = seen.clone();
        let policy = FallbackPolicy::<u32, String>::from_fn(move |err| {
            *sink.lock().unwrap() = Some(err.to_string());
            Ok(1)
        });

        assert_eq!(policy.run(|| async { failing() }).await, Ok(1));
        assert_eq!(seen.lock().unwrap().as_deref(), Some("pantry offline"));
    }

    #[tokio::test]
    async fn failing_fn_propagates_its_own_error() {
        let policy = FallbackPolicy::<u32, String>::value(0)
            .with_fn(|_| Err(ResilienceError::Inner("backup pantry offline too".into())));

        assert_eq!(
            policy.run(|| async { failing() }).await,
            Err(ResilienceError::Inner("backup pantry offline too".into()))
        );
    }

    #[tokio::test]
    async fn none_propagates_original_error() {
        let policy = FallbackPolicy::<u32, String>::none().log_error(false);
        assert!(!policy.has_fallback());
        assert_eq!(policy.run(|| async { failing() }).await, failing());
    }

    #[tokio::test]
    async fn cleared_value_propagates_original_error() {
        let policy = FallbackPolicy::<u32, String>::value(3).with_value(None);
        assert_eq!(policy.run(|| async { failing() }).await, failing());
    }

    #[tokio::test]
    async fn default_value_uses_type_default() {
        let policy = FallbackPolicy::<Vec<String>, String>::default_value();
        let result = policy
            .run(|| async { Err(ResilienceError::Inner("no recipes".to_string())) })
            .await;
        assert_eq!(result, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn operation_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let policy = FallbackPolicy::<u32, String>::value(0);

        let _ = policy
            .run(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    failing()
                }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    fn scorched() -> Result<u32, ResilienceError<String>> {
        panic!("pan scorched")
    }

    #[tokio::test]
    async fn panicking_operation_is_a_failure() {
        let policy = FallbackPolicy::<u32, String>::value(0).log_error(false);
        assert_eq!(policy.run(|| async { scorched() }).await, Ok(0));

        let seen = FallbackPolicy::<u32, String>::from_fn(|err| {
            assert!(err.is_panicked());
            Ok(1)
        });
        assert_eq!(seen.run(|| async { scorched() }).await, Ok(1));
    }

    #[test]
    fn debug_hides_function() {
        let policy = FallbackPolicy::<u32, String>::from_fn(|_| Ok(1));
        let debug = format!("{:?}", policy);
        assert!(debug.contains("<fn>"));
        assert!(debug.contains("log_error: true"));
    }
}
