//! Mapping arbitrary errors onto [`ErrorCode`]s.
//!
//! Precedence, applied to each error of the `source()` chain in turn:
//! 1. mappings registered with [`register_mapping`];
//! 2. the application's own hierarchy ([`AppError`], [`ErrorInfo`]);
//! 3. heuristics for standard and ecosystem error types;
//!
//! and `INTERNAL_ERROR` when nothing in the chain matched.
//!
//! # Process-wide state
//!
//! The mapping table is process-wide and append-only: it is created on first use, entries
//! are never removed, and the first registration for a type wins. Register mappings once
//! during startup, before the first failure is classified.

use super::info::{AppError, ErrorCode, ErrorInfo};
use crate::error::ResilienceError;
use std::any::TypeId;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::io;
use std::sync::{OnceLock, RwLock};

type Matcher = fn(&(dyn StdError + 'static)) -> bool;

struct Mapping {
    matches: Matcher,
    code: ErrorCode,
}

fn registry() -> &'static RwLock<HashMap<TypeId, Mapping>> {
    static REGISTRY: OnceLock<RwLock<HashMap<TypeId, Mapping>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn is_type<E: StdError + 'static>(err: &(dyn StdError + 'static)) -> bool {
    err.is::<E>()
}

/// Classify every error of type `E` as `code`.
///
/// Returns `false` when `E` already had a mapping; the existing entry is kept.
pub fn register_mapping<E>(code: ErrorCode) -> bool
where
    E: StdError + 'static,
{
    // A writer panicking mid-insert leaves the map intact, so poisoning is ignored.
    let mut table = registry().write().unwrap_or_else(|poisoned| poisoned.into_inner());
    let id = TypeId::of::<E>();
    if table.contains_key(&id) {
        return false;
    }
    table.insert(id, Mapping { matches: is_type::<E>, code });
    true
}

fn registered_code(err: &(dyn StdError + 'static)) -> Option<ErrorCode> {
    let table = registry().read().unwrap_or_else(|poisoned| poisoned.into_inner());
    table.values().find(|m| (m.matches)(err)).map(|m| m.code)
}

fn hierarchy_code(err: &(dyn StdError + 'static)) -> Option<ErrorCode> {
    if let Some(app) = err.downcast_ref::<AppError>() {
        return Some(app.code());
    }
    err.downcast_ref::<ErrorInfo>().map(|info| info.code())
}

fn io_code(kind: io::ErrorKind) -> ErrorCode {
    use io::ErrorKind::*;
    match kind {
        NotFound => ErrorCode::NotFound,
        PermissionDenied => ErrorCode::PermissionDenied,
        TimedOut | WouldBlock => ErrorCode::Timeout,
        InvalidInput | InvalidData => ErrorCode::ValidationError,
        AlreadyExists => ErrorCode::Duplicate,
        UnexpectedEof => ErrorCode::ParsingError,
        _ => ErrorCode::NetworkError,
    }
}

fn heuristic_code(err: &(dyn StdError + 'static)) -> Option<ErrorCode> {
    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        return Some(io_code(io_err.kind()));
    }
    if err.is::<std::num::ParseIntError>()
        || err.is::<std::num::ParseFloatError>()
        || err.is::<std::str::ParseBoolError>()
        || err.is::<std::char::ParseCharError>()
    {
        return Some(ErrorCode::ValidationError);
    }
    if err.is::<std::string::FromUtf8Error>() || err.is::<std::str::Utf8Error>() {
        return Some(ErrorCode::InvalidFormat);
    }
    if err.is::<chrono::ParseError>() {
        return Some(ErrorCode::InvalidFormat);
    }
    if err.is::<serde_json::Error>() {
        return Some(ErrorCode::ParsingError);
    }
    if err.is::<tokio::time::error::Elapsed>() {
        return Some(ErrorCode::Timeout);
    }
    None
}

fn chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> + 'a {
    std::iter::successors(Some(err), |e| (*e).source())
}

/// Classify an error into an [`ErrorCode`].
pub fn classify(err: &(dyn StdError + 'static)) -> ErrorCode {
    chain(err)
        .find_map(|e| registered_code(e).or_else(|| hierarchy_code(e)).or_else(|| heuristic_code(e)))
        .unwrap_or(ErrorCode::InternalError)
}

impl ErrorInfo {
    /// Describe `err` as an `ErrorInfo` originating from `source`.
    ///
    /// An `ErrorInfo` (anywhere in the chain) is returned as-is, keeping its own code,
    /// details and user message; only an empty `source` is filled in.
    pub fn from_error(err: &(dyn StdError + 'static), source: &str) -> ErrorInfo {
        if let Some(info) = chain(err).find_map(|e| e.downcast_ref::<ErrorInfo>()) {
            let info = info.clone();
            return if info.origin().is_empty() { info.with_source(source) } else { info };
        }
        let info = ErrorInfo::new(classify(err), err.to_string()).with_source(source);
        match err.downcast_ref::<AppError>() {
            Some(app) => {
                let from_app = ErrorInfo::from(app.clone());
                info.with_details(from_app.details().clone())
            }
            None => info,
        }
    }

    /// Describe a policy failure; policy errors get their own codes, inner errors are
    /// classified like any other error.
    pub fn from_resilience<E>(err: ResilienceError<E>, source: &str) -> ErrorInfo
    where
        E: StdError + 'static,
    {
        let message = err.to_string();
        match err {
            ResilienceError::Timeout { timeout, .. } => ErrorInfo::timeout(message)
                .with_detail("timeout_secs", timeout.as_secs_f64())
                .with_source(source),
            ResilienceError::Saturated { max_concurrent, waited } => {
                ErrorInfo::new(ErrorCode::RateLimited, message)
                    .with_detail("max_concurrent", max_concurrent)
                    .with_detail("waited_secs", waited.as_secs_f64())
                    .with_source(source)
            }
            ResilienceError::NotAttempted | ResilienceError::Panicked(_) => {
                ErrorInfo::internal(message).with_source(source)
            }
            ResilienceError::Inner(e) => ErrorInfo::from_error(&e, source),
        }
    }
}

impl From<ResilienceError<ErrorInfo>> for ErrorInfo {
    fn from(err: ResilienceError<ErrorInfo>) -> Self {
        ErrorInfo::from_resilience(err, "")
    }
}
