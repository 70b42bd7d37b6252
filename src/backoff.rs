//! Backoff strategies for retry policies.
//!
//! Attempt semantics: index `0` is the initial call (no delay); retries start at `1`. The
//! exponential strategy waits `base * factor^(retry - 1)`, so the sleep after the failed
//! attempt `n` (0-based) is `base * factor^n`.
//!
//! ```rust
//! use std::time::Duration;
//! use kitchen_resilience::Backoff;
//!
//! let backoff = Backoff::exponential(Duration::from_millis(500))
//!     .with_factor(3.0)
//!     .unwrap();
//! assert_eq!(backoff.delay(0), Duration::ZERO);
//! assert_eq!(backoff.delay(1), Duration::from_millis(500));
//! assert_eq!(backoff.delay(2), Duration::from_millis(1500));
//! ```
//!
//! Computations that would overflow saturate to [`MAX_BACKOFF`] (1 day).

use std::time::Duration;

/// Maximum delay used when calculations overflow (1 day).
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors returned by backoff configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackoffError {
    #[error("with_max is only valid for linear or exponential backoff")]
    ConstantDoesNotSupportMax,
    #[error("max must be greater than zero")]
    MaxMustBePositive,
    #[error("max ({max:?}) must be >= base ({base:?})")]
    MaxLessThanBase { base: Duration, max: Duration },
    #[error("backoff factor must be a finite number >= 1.0 (got {0})")]
    InvalidFactor(f64),
    #[error("with_factor is only valid for exponential backoff")]
    FactorRequiresExponential,
}

#[derive(Debug, Clone, PartialEq)]
enum BackoffKind {
    Constant { delay: Duration },
    Linear { base: Duration, max: Option<Duration> },
    Exponential { base: Duration, factor: f64, max: Option<Duration> },
}

/// How long to wait before each retry.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    kind: BackoffKind,
}

impl Backoff {
    /// The same delay before every retry.
    pub fn constant(delay: Duration) -> Self {
        Self { kind: BackoffKind::Constant { delay } }
    }

    /// `base`, `2 * base`, `3 * base`, ...
    pub fn linear(base: Duration) -> Self {
        Self { kind: BackoffKind::Linear { base, max: None } }
    }

    /// `base`, `2 * base`, `4 * base`, ... (factor 2 until changed with [`with_factor`](Self::with_factor)).
    pub fn exponential(base: Duration) -> Self {
        Self { kind: BackoffKind::Exponential { base, factor: 2.0, max: None } }
    }

    /// Set the growth factor of an exponential backoff.
    pub fn with_factor(mut self, factor: f64) -> Result<Self, BackoffError> {
        if !factor.is_finite() || factor < 1.0 {
            return Err(BackoffError::InvalidFactor(factor));
        }
        match &mut self.kind {
            BackoffKind::Exponential { factor: existing, .. } => {
                *existing = factor;
                Ok(self)
            }
            _ => Err(BackoffError::FactorRequiresExponential),
        }
    }

    /// Cap the delay of a linear or exponential backoff.
    pub fn with_max(mut self, max: Duration) -> Result<Self, BackoffError> {
        if max.is_zero() {
            return Err(BackoffError::MaxMustBePositive);
        }
        match &mut self.kind {
            BackoffKind::Linear { base, max: existing }
            | BackoffKind::Exponential { base, max: existing, .. } => {
                if max < *base {
                    return Err(BackoffError::MaxLessThanBase { base: *base, max });
                }
                *existing = Some(max);
                Ok(self)
            }
            BackoffKind::Constant { .. } => Err(BackoffError::ConstantDoesNotSupportMax),
        }
    }

    /// Delay before retry number `attempt` (0 = initial call, no delay).
    pub fn delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let (raw, max) = match &self.kind {
            BackoffKind::Constant { delay } => (*delay, None),
            BackoffKind::Linear { base, max } => {
                let n = attempt.min(u32::MAX as usize) as u32;
                (base.checked_mul(n).unwrap_or(MAX_BACKOFF), *max)
            }
            BackoffKind::Exponential { base, factor, max } => {
                let exponent = (attempt - 1).min(i32::MAX as usize) as i32;
                (scale(*base, factor.powi(exponent)), *max)
            }
        };
        max.map(|m| raw.min(m)).unwrap_or(raw).min(MAX_BACKOFF)
    }
}

fn scale(base: Duration, multiplier: f64) -> Duration {
    let nanos = (base.as_nanos() as f64 * multiplier).round();
    if !nanos.is_finite() || nanos >= MAX_BACKOFF.as_nanos() as f64 {
        MAX_BACKOFF
    } else {
        Duration::from_nanos(nanos.max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_backoff_returns_same_delay() {
        let backoff = Backoff::constant(Duration::from_secs(1));
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(100), Duration::from_secs(1));
    }

    #[test]
    fn linear_backoff_grows_linearly() {
        let backoff = Backoff::linear(Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(3), Duration::from_millis(300));
    }

    #[test]
    fn exponential_backoff_doubles_by_default() {
        let backoff = Backoff::exponential(Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
    }

    #[test]
    fn exponential_backoff_uses_custom_factor() {
        let backoff = Backoff::exponential(Duration::from_secs(2)).with_factor(3.0).unwrap();
        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(2), Duration::from_secs(6));
        assert_eq!(backoff.delay(3), Duration::from_secs(18));
    }

    #[test]
    fn factor_one_is_constant() {
        let backoff = Backoff::exponential(Duration::from_millis(500)).with_factor(1.0).unwrap();
        assert_eq!(backoff.delay(5), Duration::from_millis(500));
    }

    #[test]
    fn invalid_factors_are_rejected() {
        let base = Duration::from_millis(1);
        assert_eq!(
            Backoff::exponential(base).with_factor(0.5),
            Err(BackoffError::InvalidFactor(0.5))
        );
        assert!(Backoff::exponential(base).with_factor(f64::NAN).is_err());
        assert_eq!(
            Backoff::linear(base).with_factor(2.0),
            Err(BackoffError::FactorRequiresExponential)
        );
    }

    #[test]
    fn max_caps_growth() {
        let backoff = Backoff::exponential(Duration::from_millis(100))
            .with_max(Duration::from_millis(250))
            .unwrap();
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(250));
    }

    #[test]
    fn max_validation() {
        let base = Duration::from_secs(1);
        assert_eq!(
            Backoff::constant(base).with_max(base),
            Err(BackoffError::ConstantDoesNotSupportMax)
        );
        assert_eq!(Backoff::linear(base).with_max(Duration::ZERO), Err(BackoffError::MaxMustBePositive));
        assert!(matches!(
            Backoff::linear(base).with_max(Duration::from_millis(1)),
            Err(BackoffError::MaxLessThanBase { .. })
        ));
    }

    #[test]
    fn huge_attempts_saturate() {
        let backoff = Backoff::exponential(Duration::from_secs(1));
        assert_eq!(backoff.delay(usize::MAX), MAX_BACKOFF);
        let backoff = Backoff::linear(Duration::from_secs(3600));
        assert_eq!(backoff.delay(1_000), MAX_BACKOFF);
    }
}
