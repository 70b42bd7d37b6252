//! Error types for resilience policies
use std::fmt;
use std::time::Duration;

/// Unified error type returned by every [`Policy`](crate::Policy).
///
/// Policy-specific failures (`Timeout`, `Saturated`, ...) and failures of the wrapped
/// operation itself (`Inner`) travel through the same channel, so nothing escapes a
/// `Policy::execute` call other than a value of this type.
#[derive(Debug, Clone, PartialEq)]
pub enum ResilienceError<E> {
    /// The operation did not finish within the timeout.
    Timeout { elapsed: Duration, timeout: Duration },
    /// The bulkhead had no free slot within its acquire budget.
    Saturated { max_concurrent: usize, waited: Duration },
    /// A retry policy configured with zero attempts never ran the operation.
    NotAttempted,
    /// The operation panicked.
    Panicked(String),
    /// The underlying operation failed.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for ResilienceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { timeout, .. } => {
                write!(f, "Timeout after {}s", timeout.as_secs_f64())
            }
            Self::Saturated { max_concurrent, waited } => {
                write!(
                    f,
                    "bulkhead saturated: max {} concurrent executions, no slot after {:?}",
                    max_concurrent, waited
                )
            }
            Self::NotAttempted => write!(f, "operation was never attempted (max_attempts = 0)"),
            Self::Panicked(msg) => write!(f, "operation panicked: {}", msg),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ResilienceError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<E> for ResilienceError<E> {
    fn from(err: E) -> Self {
        ResilienceError::Inner(err)
    }
}

impl<E> ResilienceError<E> {
    /// Check if this error is due to timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
    /// Check if this error is due to bulkhead saturation
    pub fn is_saturated(&self) -> bool {
        matches!(self, Self::Saturated { .. })
    }
    pub fn is_not_attempted(&self) -> bool {
        matches!(self, Self::NotAttempted)
    }
    pub fn is_panicked(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
    /// Check if this error wraps an inner error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }
    /// Get the inner error if this is an Inner variant
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
    /// Access timeout details as (elapsed, timeout).
    pub fn timeout_details(&self) -> Option<(Duration, Duration)> {
        match self {
            Self::Timeout { elapsed, timeout } => Some((*elapsed, *timeout)),
            _ => None,
        }
    }
    /// Access saturation details as (max_concurrent, waited).
    pub fn saturation_details(&self) -> Option<(usize, Duration)> {
        match self {
            Self::Saturated { max_concurrent, waited } => Some((*max_concurrent, *waited)),
            _ => None,
        }
    }
    /// Transform the inner error, leaving policy errors untouched.
    pub fn map_inner<F, E2>(self, f: F) -> ResilienceError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Timeout { elapsed, timeout } => ResilienceError::Timeout { elapsed, timeout },
            Self::Saturated { max_concurrent, waited } => {
                ResilienceError::Saturated { max_concurrent, waited }
            }
            Self::NotAttempted => ResilienceError::NotAttempted,
            Self::Panicked(msg) => ResilienceError::Panicked(msg),
            Self::Inner(e) => ResilienceError::Inner(f(e)),
        }
    }
}

/// Render a panic payload captured by `catch_unwind` or a failed join.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
