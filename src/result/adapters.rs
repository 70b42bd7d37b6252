//! Adapters turning ordinary fallible code into `Result<T, ErrorInfo>`.

use super::info::{ErrorCode, ErrorInfo};
use crate::error::panic_message;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};

fn panicked(payload: Box<dyn std::any::Any + Send>, source: &str) -> ErrorInfo {
    let message = panic_message(payload.as_ref());
    tracing::error!(source, error = %message, "operation panicked");
    ErrorInfo::internal(message).with_source(source)
}

/// Run `f`, classifying its error and converting a panic into `INTERNAL_ERROR`.
pub fn safe<T, E, F>(source: &str, f: F) -> Result<T, ErrorInfo>
where
    F: FnOnce() -> Result<T, E>,
    E: StdError + 'static,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(ErrorInfo::from_error(&err, source)),
        Err(payload) => Err(panicked(payload, source)),
    }
}

/// Async counterpart of [`safe`].
pub async fn safe_async<T, E, Fut>(source: &str, fut: Fut) -> Result<T, ErrorInfo>
where
    Fut: Future<Output = Result<T, E>>,
    E: StdError + 'static,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(ErrorInfo::from_error(&err, source)),
        Err(payload) => Err(panicked(payload, source)),
    }
}

/// User-facing part of a failure, as sent to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
}

/// Envelope returned by API handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn err(info: &ErrorInfo) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: info.code(),
                message: info.message_for_user().to_string(),
                details: info.details().clone(),
            }),
        }
    }
}

impl<T> From<Result<T, ErrorInfo>> for ApiResponse<T> {
    fn from(result: Result<T, ErrorInfo>) -> Self {
        result_api(result)
    }
}

/// Shape a result for an API client; only the user-facing message leaves the process.
pub fn result_api<T>(result: Result<T, ErrorInfo>) -> ApiResponse<T> {
    match result {
        Ok(data) => ApiResponse::ok(data),
        Err(info) => {
            tracing::debug!(code = %info.code(), source = %info.origin(), error = %info.message(), "api call failed");
            ApiResponse::err(&info)
        }
    }
}
