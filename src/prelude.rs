//! Convenient re-exports for common kitchen-resilience types.
pub use crate::{
    algebra::Composite,
    backoff::{Backoff, BackoffError},
    bulkhead::{BulkheadError, BulkheadPolicy},
    error::ResilienceError,
    fallback::FallbackPolicy,
    jitter::Jitter,
    policy::{Operation, Policy, PolicyExt},
    presets,
    result::{AppResult, ErrorCode, ErrorInfo, ResultExt},
    retry::{BuildError, RetryPolicy, RetryPolicyBuilder},
    timeout::{TimeoutError, TimeoutPolicy},
};
