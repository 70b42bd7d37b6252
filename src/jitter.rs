//! Jitter strategies to prevent synchronized retry storms
//!
//! - `None`: deterministic delays, for tests or tightly controlled workflows.
//! - `Proportional`: delay multiplied by a uniform factor in `[0.5, 1.5)`; the default when
//!   a retry policy is built with `jitter(true)`.
//! - `Full`: uniform in `[0, delay]`.
//! - `Equal`: uniform in `[delay/2, delay]`, keeps a floor while adding randomness.
//!
//! Uses `rand`'s thread-local RNG; deterministic RNGs can be injected via `apply_with_rng`.

use rand::{rng, Rng};
use std::time::Duration;

/// Jitter strategy for randomizing retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Jitter {
    /// No jitter - use exact backoff delay
    #[default]
    None,
    /// Random factor in `[0.5, 1.5)` applied to the delay
    Proportional,
    /// Full jitter: random between 0 and delay
    Full,
    /// Equal jitter: random between delay/2 and delay
    Equal,
}

impl Jitter {
    /// `Proportional` when enabled, `None` otherwise.
    pub fn enabled(on: bool) -> Self {
        if on {
            Jitter::Proportional
        } else {
            Jitter::None
        }
    }

    /// Apply jitter to a delay duration
    pub fn apply(&self, delay: Duration) -> Duration {
        self.apply_with_rng(delay, &mut rng())
    }

    /// Apply jitter with a caller-provided RNG
    pub fn apply_with_rng<R: Rng + ?Sized>(&self, delay: Duration, rng: &mut R) -> Duration {
        if delay.is_zero() {
            return delay;
        }
        match self {
            Jitter::None => delay,
            Jitter::Proportional => delay.mul_f64(rng.random_range(0.5..1.5)),
            Jitter::Full => {
                let nanos = as_nanos_saturated(delay);
                Duration::from_nanos(rng.random_range(0..=nanos))
            }
            Jitter::Equal => {
                let nanos = as_nanos_saturated(delay);
                Duration::from_nanos(rng.random_range(nanos / 2..=nanos))
            }
        }
    }
}

fn as_nanos_saturated(duration: Duration) -> u64 {
    duration.as_nanos().try_into().unwrap_or(u64::MAX)
}
