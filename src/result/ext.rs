//! Panic-safe extensions for `Result`.
//!
//! Rust's `Result` already is the two-variant success/failure type; what it lacks is
//! the guarantee that user callbacks cannot unwind through a transformation. The
//! `*_caught` methods run their closure under `catch_unwind` and turn a panic into
//! `Err(ErrorInfo { code: INTERNAL_ERROR, .. })`, converted into the error type via
//! `From<ErrorInfo>`. The taps never change the result and swallow (and log) panics.

use super::info::ErrorInfo;
use crate::error::panic_message;
use std::panic::{catch_unwind, AssertUnwindSafe};

fn caught<R>(f: impl FnOnce() -> R) -> Result<R, ErrorInfo> {
    catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| ErrorInfo::internal(panic_message(payload.as_ref())))
}

/// Extension methods for any `Result<T, E>`.
pub trait ResultExt<T, E>: Sized {
    /// Run `f` on the success value for its side effect.
    fn on_success<F>(self, f: F) -> Self
    where
        F: FnOnce(&T);

    /// Run `f` on the error for its side effect.
    fn on_failure<F>(self, f: F) -> Self
    where
        F: FnOnce(&E);

    /// Like `map`, but a panic in `f` becomes an `INTERNAL_ERROR`.
    fn map_caught<U, F>(self, f: F) -> Result<U, E>
    where
        F: FnOnce(T) -> U,
        E: From<ErrorInfo>;

    /// Like `and_then`, but a panic in `f` becomes an `INTERNAL_ERROR`.
    fn and_then_caught<U, F>(self, f: F) -> Result<U, E>
    where
        F: FnOnce(T) -> Result<U, E>,
        E: From<ErrorInfo>;

    /// Like `map_err`, but a panic in `f` becomes an `INTERNAL_ERROR` of the new type.
    fn map_err_caught<E2, F>(self, f: F) -> Result<T, E2>
    where
        F: FnOnce(E) -> E2,
        E2: From<ErrorInfo>;

    /// Like `or_else`, but a panic in `f` becomes an `INTERNAL_ERROR` of the new type.
    fn or_else_caught<E2, F>(self, f: F) -> Result<T, E2>
    where
        F: FnOnce(E) -> Result<T, E2>,
        E2: From<ErrorInfo>;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn on_success<F>(self, f: F) -> Self
    where
        F: FnOnce(&T),
    {
        if let Ok(value) = &self {
            if let Err(info) = caught(|| f(value)) {
                tracing::error!(error = %info.message(), "on_success callback panicked");
            }
        }
        self
    }

    fn on_failure<F>(self, f: F) -> Self
    where
        F: FnOnce(&E),
    {
        if let Err(err) = &self {
            if let Err(info) = caught(|| f(err)) {
                tracing::error!(error = %info.message(), "on_failure callback panicked");
            }
        }
        self
    }

    fn map_caught<U, F>(self, f: F) -> Result<U, E>
    where
        F: FnOnce(T) -> U,
        E: From<ErrorInfo>,
    {
        match self {
            Ok(value) => caught(|| f(value)).map_err(E::from),
            Err(e) => Err(e),
        }
    }

    fn and_then_caught<U, F>(self, f: F) -> Result<U, E>
    where
        F: FnOnce(T) -> Result<U, E>,
        E: From<ErrorInfo>,
    {
        match self {
            Ok(value) => caught(|| f(value)).map_err(E::from)?,
            Err(e) => Err(e),
        }
    }

    fn map_err_caught<E2, F>(self, f: F) -> Result<T, E2>
    where
        F: FnOnce(E) -> E2,
        E2: From<ErrorInfo>,
    {
        match self {
            Ok(value) => Ok(value),
            Err(e) => Err(caught(|| f(e)).unwrap_or_else(E2::from)),
        }
    }

    fn or_else_caught<E2, F>(self, f: F) -> Result<T, E2>
    where
        F: FnOnce(E) -> Result<T, E2>,
        E2: From<ErrorInfo>,
    {
        match self {
            Ok(value) => Ok(value),
            Err(e) => caught(|| f(e)).map_err(E2::from)?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ErrorCode;
    use std::cell::Cell;

    #[test]
    fn map_caught_converts_panic_to_internal_error() {
        let r: Result<i32, ErrorInfo> = Ok(1);
        let mapped: Result<i32, ErrorInfo> = r.map_caught(|_| panic!("division by zero"));
        let err = mapped.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.message(), "division by zero");
    }

    #[test]
    fn map_caught_passes_errors_through_untouched() {
        let r: Result<i32, ErrorInfo> = Err(ErrorInfo::not_found("pantry item", 7));
        let calls = Cell::new(0);
        let mapped = r.map_caught(|v| {
            calls.set(calls.get() + 1);
            v * 2
        });
        assert_eq!(calls.get(), 0);
        assert_eq!(mapped.unwrap_err().code(), ErrorCode::NotFound);
    }

    #[test]
    fn and_then_caught_chains_and_catches() {
        let ok: Result<i32, ErrorInfo> = Ok(2);
        assert_eq!(ok.clone().and_then_caught(|v| Ok::<_, ErrorInfo>(v + 1)).unwrap(), 3);

        let failed = ok
            .clone()
            .and_then_caught(|_| Err::<i32, _>(ErrorInfo::validation("negative portion")));
        assert_eq!(failed.unwrap_err().code(), ErrorCode::ValidationError);

        let panicked = ok.and_then_caught(|_| -> Result<i32, ErrorInfo> { panic!("boom") });
        assert_eq!(panicked.unwrap_err().code(), ErrorCode::InternalError);
    }

    #[test]
    fn error_channel_variants_catch_panics() {
        let r: Result<i32, &str> = Err("raw");
        let mapped: Result<i32, ErrorInfo> = r.map_err_caught(|e| ErrorInfo::validation(e));
        assert_eq!(mapped.unwrap_err().message(), "raw");

        let r: Result<i32, &str> = Err("raw");
        let recovered: Result<i32, ErrorInfo> = r.or_else_caught(|_| Ok(10));
        assert_eq!(recovered.unwrap(), 10);

        let r: Result<i32, &str> = Err("raw");
        let panicked: Result<i32, ErrorInfo> = r.or_else_caught(|_| panic!("handler bug"));
        assert_eq!(panicked.unwrap_err().code(), ErrorCode::InternalError);
    }

    #[test]
    fn taps_see_values_and_never_propagate_panics() {
        let seen = Cell::new(0);
        let r: Result<i32, String> = Ok(5);
        let r = r.on_success(|v| seen.set(*v)).on_failure(|_| seen.set(-1));
        assert_eq!(seen.get(), 5);
        assert_eq!(r, Ok(5));

        let r: Result<i32, String> = Err("no".into());
        let r = r.on_failure(|_| panic!("tap exploded")).on_success(|_| unreachable!());
        assert_eq!(r, Err("no".to_string()));
    }
}
