//! Pre-tuned policy pipelines for common call shapes.
//!
//! Every preset returns a fresh [`Composite`]. A preset that contains a bulkhead creates a new
//! semaphore on each call, so to make several call sites share one concurrency limit build the
//! preset once and clone the composite (clones share their policies).
//!
//! ```rust
//! use kitchen_resilience::{presets, PolicyExt, ResilienceError};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let weather = presets::external_api::<String, String>();
//! let forecast = weather
//!     .run(|| async { Ok::<_, ResilienceError<String>>("sunny".to_string()) })
//!     .await;
//! assert_eq!(forecast.unwrap(), "sunny");
//! # });
//! ```
//!
//! | Preset | Pipeline (outermost first) |
//! |---|---|
//! | [`external_api`] | Timeout 30s → Retry 3 × (1s, ×2, jitter) → Bulkhead 5 / wait 5s |
//! | [`database`] | Timeout 10s → Retry 2 × (0.5s, ×2, no jitter) |
//! | [`cache_lookup`] | Timeout 1s → Fallback none, silent |
//! | [`ai_call`] | Timeout 60s → Retry 3 × (2s, ×3, jitter) → Bulkhead 3 / wait 30s |

use crate::{BulkheadPolicy, Composite, FallbackPolicy, PolicyExt, RetryPolicy, TimeoutPolicy};
use std::fmt;
use std::time::Duration;

pub const EXTERNAL_API_TIMEOUT: Duration = Duration::from_secs(30);
pub const EXTERNAL_API_RETRY_ATTEMPTS: usize = 3;
pub const EXTERNAL_API_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
pub const EXTERNAL_API_BACKOFF_FACTOR: f64 = 2.0;
pub const EXTERNAL_API_MAX_CONCURRENT: usize = 5;
pub const EXTERNAL_API_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub const DATABASE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DATABASE_RETRY_ATTEMPTS: usize = 2;
pub const DATABASE_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DATABASE_BACKOFF_FACTOR: f64 = 2.0;

pub const CACHE_LOOKUP_TIMEOUT: Duration = Duration::from_secs(1);

pub const AI_CALL_TIMEOUT: Duration = Duration::from_secs(60);
pub const AI_CALL_RETRY_ATTEMPTS: usize = 3;
pub const AI_CALL_RETRY_BASE_DELAY: Duration = Duration::from_secs(2);
pub const AI_CALL_BACKOFF_FACTOR: f64 = 3.0;
pub const AI_CALL_MAX_CONCURRENT: usize = 3;
pub const AI_CALL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Third-party HTTP APIs: bounded overall wait, jittered retries, at most 5 calls in flight.
pub fn external_api<T, E>() -> Composite<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    TimeoutPolicy::from_duration_unchecked(EXTERNAL_API_TIMEOUT)
        .then(RetryPolicy::from_parts(
            EXTERNAL_API_RETRY_ATTEMPTS,
            EXTERNAL_API_RETRY_BASE_DELAY,
            EXTERNAL_API_BACKOFF_FACTOR,
            true,
        ))
        + BulkheadPolicy::from_parts(EXTERNAL_API_MAX_CONCURRENT, EXTERNAL_API_ACQUIRE_TIMEOUT)
}

/// Database calls: short timeout, one deterministic retry.
pub fn database<T, E>() -> Composite<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    TimeoutPolicy::from_duration_unchecked(DATABASE_TIMEOUT).then(RetryPolicy::from_parts(
        DATABASE_RETRY_ATTEMPTS,
        DATABASE_RETRY_BASE_DELAY,
        DATABASE_BACKOFF_FACTOR,
        false,
    ))
}

/// Cache lookups: give up after a second.
///
/// The fallback carries no value, so a miss or timeout still reaches the caller as `Err`,
/// without a log line; the caller decides to go to the source of truth.
pub fn cache_lookup<T, E>() -> Composite<T, E>
where
    T: Clone + fmt::Debug + Send + Sync + 'static,
    E: fmt::Display + Send + 'static,
{
    TimeoutPolicy::from_duration_unchecked(CACHE_LOOKUP_TIMEOUT)
        .then(FallbackPolicy::none().log_error(false))
}

/// AI/LLM calls: long timeout, slower-growing retries, at most 3 calls in flight.
pub fn ai_call<T, E>() -> Composite<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    TimeoutPolicy::from_duration_unchecked(AI_CALL_TIMEOUT)
        .then(RetryPolicy::from_parts(
            AI_CALL_RETRY_ATTEMPTS,
            AI_CALL_RETRY_BASE_DELAY,
            AI_CALL_BACKOFF_FACTOR,
            true,
        ))
        + BulkheadPolicy::from_parts(AI_CALL_MAX_CONCURRENT, AI_CALL_ACQUIRE_TIMEOUT)
}
