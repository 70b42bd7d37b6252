//! The error channel: structured failures on top of `Result`.
//!
//! - [`ErrorInfo`] / [`ErrorCode`]: what went wrong, for logs and for users.
//! - [`ResultExt`]: panic-safe transformations and taps.
//! - combinators over many results ([`combine`], [`collect`], [`first_ok`], [`collect_all`]).
//! - [`classify`] / [`register_mapping`]: turning foreign errors into codes.
//! - [`safe`], [`safe_async`], [`result_api`]: adapters for call sites.

mod adapters;
mod classify;
mod combinators;
mod ext;
mod info;

pub use adapters::{result_api, safe, safe_async, ApiError, ApiResponse};
pub use classify::{classify, register_mapping};
pub use combinators::{collect, collect_all, combine, first_ok};
pub use ext::ResultExt;
pub use info::{AppError, ErrorCategory, ErrorCode, ErrorInfo, UnknownErrorCode};

/// Result carrying an [`ErrorInfo`] on failure.
pub type AppResult<T> = Result<T, ErrorInfo>;
