//! Bulkhead slots held by the current task.
//!
//! A bulkhead records its permit here for as long as it runs an operation. Work that leaves
//! the task takes a copy of the record along: the timed task [`TimeoutPolicy`] spawns on the
//! worker pool, and the closure [`Operation::blocking`] hands to the blocking pool. A slot is
//! released only once every holder is gone, so an aborted or abandoned caller does not free
//! it while the work it admitted is still running.
//!
//! [`TimeoutPolicy`]: crate::TimeoutPolicy
//! [`Operation::blocking`]: crate::Operation::blocking

use std::future::Future;
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;

tokio::task_local! {
    static HELD: HeldSlots;
}

#[derive(Debug, Clone, Default)]
pub(crate) struct HeldSlots(Vec<Arc<OwnedSemaphorePermit>>);

impl HeldSlots {
    /// Slots of the enclosing bulkheads; empty outside any bulkhead.
    pub(crate) fn current() -> Self {
        HELD.try_with(Clone::clone).unwrap_or_default()
    }

    pub(crate) fn with(mut self, permit: OwnedSemaphorePermit) -> Self {
        self.0.push(Arc::new(permit));
        self
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    /// Run `fut` with these slots visible to [`HeldSlots::current`].
    pub(crate) fn scope<F: Future>(self, fut: F) -> impl Future<Output = F::Output> {
        HELD.scope(self, fut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Semaphore;

    #[tokio::test]
    async fn nested_scopes_accumulate_and_release() {
        let outer = Arc::new(Semaphore::new(1));
        let inner = Arc::new(Semaphore::new(1));
        assert_eq!(HeldSlots::current().len(), 0);

        let outer_slots = HeldSlots::current().with(Arc::clone(&outer).try_acquire_owned().unwrap());
        let seen = outer_slots
            .scope(async {
                let inner_slots =
                    HeldSlots::current().with(Arc::clone(&inner).try_acquire_owned().unwrap());
                inner_slots.scope(async { HeldSlots::current().len() }).await
            })
            .await;

        assert_eq!(seen, 2);
        assert_eq!(outer.available_permits(), 1);
        assert_eq!(inner.available_permits(), 1);
    }

    #[tokio::test]
    async fn a_copy_keeps_the_slot_taken() {
        let semaphore = Arc::new(Semaphore::new(1));
        let slots = HeldSlots::default().with(Arc::clone(&semaphore).try_acquire_owned().unwrap());
        let copy = slots.scope(async { HeldSlots::current() }).await;

        assert_eq!(semaphore.available_permits(), 0);
        drop(copy);
        assert_eq!(semaphore.available_permits(), 1);
    }
}
