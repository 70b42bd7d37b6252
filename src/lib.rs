#![forbid(unsafe_code)]

//! # kitchen-resilience
//!
//! Resilience core of the kitchen application: an explicit error channel on top of `Result`
//! and composable async policies for the calls that reach outside the process.
//!
//! ## Features
//!
//! - **Structured errors**: [`ErrorInfo`] with string-valued [`ErrorCode`]s, panic-safe
//!   transformations ([`ResultExt`]), combinators and classification of foreign errors
//! - **Retry** with exponential backoff and jitter
//! - **Timeout** on a shared worker pool
//! - **Bulkhead** concurrency limiting with a bounded wait for a slot
//! - **Fallback** values and functions
//! - **Composition** of policies into pipelines ([`Composite`]), named [`presets`], and
//!   declarative [`config`]
//! - **Tower** integration (feature `layer`, on by default)
//!
//! ## Quick Start
//!
//! ```rust
//! use kitchen_resilience::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let policy: Composite<u32, String> = TimeoutPolicy::new(Duration::from_secs(5))?
//!         .then(RetryPolicy::builder().max_attempts(3).base_delay(Duration::from_millis(10)).build()?)
//!         + FallbackPolicy::value(0);
//!
//!     let servings = policy
//!         .run(|| async {
//!             // Your async operation here
//!             Ok::<_, ResilienceError<String>>(4)
//!         })
//!         .await;
//!     assert_eq!(servings, Ok(4));
//!     Ok(())
//! }
//! ```
//!
//! Every policy answers through the same channel: `Result<T, ResilienceError<E>>`. Policy
//! failures (`Timeout`, `Saturated`, ...), failures of the operation (`Inner`) and panics of
//! the operation (`Panicked`) are values; a panicking operation never unwinds out of
//! `Policy::execute`.

pub mod algebra;
pub mod backoff;
pub mod bulkhead;
pub mod config;
pub mod error;
pub mod fallback;
pub mod jitter;
#[cfg(feature = "layer")]
pub mod layer;
pub mod policy;
pub mod prelude;
pub mod presets;
pub mod result;
pub mod retry;
pub mod sleeper;
mod slots;
pub mod timeout;
pub mod worker;

// Re-exports
pub use algebra::Composite;
pub use backoff::{Backoff, BackoffError, MAX_BACKOFF};
pub use bulkhead::{BulkheadError, BulkheadPolicy};
pub use config::{ConfigError, PipelineConfig, PolicyConfig};
pub use error::ResilienceError;
pub use fallback::FallbackPolicy;
pub use jitter::Jitter;
#[cfg(feature = "layer")]
pub use layer::{PolicyLayer, PolicyService};
pub use policy::{Operation, Policy, PolicyExt};
pub use result::{
    classify, collect, collect_all, combine, first_ok, register_mapping, result_api, safe,
    safe_async, ApiError, ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode, ErrorInfo,
    ResultExt,
};
pub use retry::{BuildError, RetryPolicy, RetryPolicyBuilder};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use timeout::{TimeoutError, TimeoutPolicy};
