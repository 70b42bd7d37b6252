//! Shared fixtures for integration tests.
#![allow(dead_code)]

use kitchen_resilience::{Operation, ResilienceError};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KitchenError {
    Connection(String),
    Value(String),
}

impl fmt::Display for KitchenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KitchenError::Connection(m) => write!(f, "connection error: {}", m),
            KitchenError::Value(m) => write!(f, "value error: {}", m),
        }
    }
}

impl std::error::Error for KitchenError {}

/// Counts invocations of the operations it builds.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Fails with `Connection` on the first `failures` calls, then answers `value`.
    pub fn flaky<T>(&self, failures: usize, value: T) -> Operation<T, KitchenError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let count = self.0.clone();
        Operation::new(move || {
            let n = count.fetch_add(1, Ordering::SeqCst);
            let value = value.clone();
            async move {
                if n < failures {
                    Err(ResilienceError::Inner(KitchenError::Connection(format!("call {}", n + 1))))
                } else {
                    Ok(value)
                }
            }
        })
    }

    /// Always fails with the given error.
    pub fn failing<T>(&self, err: KitchenError) -> Operation<T, KitchenError>
    where
        T: Send + 'static,
    {
        let count = self.0.clone();
        Operation::new(move || {
            let n = count.fetch_add(1, Ordering::SeqCst);
            let err = match &err {
                KitchenError::Connection(m) => KitchenError::Connection(format!("{} #{}", m, n + 1)),
                KitchenError::Value(m) => KitchenError::Value(format!("{} #{}", m, n + 1)),
            };
            async move { Err(ResilienceError::Inner(err)) }
        })
    }

    /// Sleeps for `delay`, then answers `value`.
    pub fn slow<T>(&self, delay: Duration, value: T) -> Operation<T, KitchenError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let count = self.0.clone();
        Operation::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
            let value = value.clone();
            async move {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
        })
    }
}
