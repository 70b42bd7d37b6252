//! Bulkhead implementation for concurrency limiting
//!
//! A bulkhead admits at most `max_concurrent` executions at a time. A caller that finds
//! every slot taken waits up to `acquire_timeout` for one to free up (zero means no waiting
//! at all), then fails with `ResilienceError::Saturated` without running the operation.
//!
//! The slot is a semaphore permit held for the duration of the operation and released when
//! it is dropped: on success, on failure, when the operation panics, and when the caller's
//! future is cancelled. Work that outlives its caller keeps the slot: an enclosing timeout
//! that gives up on an [`Operation::blocking`] closure leaves the slot taken until the
//! closure returns.
//!
//! Clones share the semaphore. To guard one resource from several call sites, build the
//! bulkhead once and clone it; independent `new` calls guard independently.

use crate::algebra::Composite;
use crate::slots::HeldSlots;
use crate::{Operation, Policy, ResilienceError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Errors produced while building a bulkhead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkheadError {
    #[error("max_concurrent must be at least 1")]
    ZeroCapacity,
    #[error("max_concurrent {0} exceeds the semaphore limit")]
    TooLarge(usize),
}

#[derive(Debug, Clone)]
pub struct BulkheadPolicy {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    acquire_timeout: Duration,
}

impl BulkheadPolicy {
    pub fn new(max_concurrent: usize, acquire_timeout: Duration) -> Result<Self, BulkheadError> {
        if max_concurrent == 0 {
            return Err(BulkheadError::ZeroCapacity);
        }
        if max_concurrent > Semaphore::MAX_PERMITS {
            return Err(BulkheadError::TooLarge(max_concurrent));
        }
        Ok(Self::from_parts(max_concurrent, acquire_timeout))
    }

    pub(crate) fn from_parts(max_concurrent: usize, acquire_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            acquire_timeout,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    /// Slots free right now.
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        let semaphore = Arc::clone(&self.semaphore);
        if self.acquire_timeout.is_zero() {
            return semaphore.try_acquire_owned().ok();
        }
        match tokio::time::timeout(self.acquire_timeout, semaphore.acquire_owned()).await {
            Ok(Ok(permit)) => Some(permit),
            // never closed
            Ok(Err(_)) | Err(_) => None,
        }
    }
}

#[async_trait]
impl<T, E> Policy<T, E> for BulkheadPolicy
where
    T: Send + 'static,
    E: Send + 'static,
{
    async fn execute(&self, operation: Operation<T, E>) -> Result<T, ResilienceError<E>> {
        let start = Instant::now();
        let Some(permit) = self.acquire().await else {
            let waited = start.elapsed();
            tracing::warn!(
                policy = "bulkhead",
                max_concurrent = self.max_concurrent,
                waited_ms = waited.as_millis() as u64,
                "bulkhead saturated; rejecting call"
            );
            return Err(ResilienceError::Saturated { max_concurrent: self.max_concurrent, waited });
        };
        HeldSlots::current().with(permit).scope(operation.call()).await
    }

    fn name(&self) -> &'static str {
        "bulkhead"
    }
}

impl<T, E> From<BulkheadPolicy> for Composite<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn from(policy: BulkheadPolicy) -> Self {
        Composite::single(policy)
    }
}
