//! The policy contract.
//!
//! Every resilience concern implements [`Policy`]: given an [`Operation`], run it under
//! the concern and report the outcome as `Result<T, ResilienceError<E>>`. An operation is
//! a cloneable, zero-argument unit of work that may be invoked any number of times (a
//! retry invokes it once per attempt, a rejected bulkhead never invokes it).

use crate::algebra::Composite;
use crate::error::panic_message;
use crate::slots::HeldSlots;
use crate::ResilienceError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

type OperationFn<T, E> =
    dyn Fn() -> BoxFuture<'static, Result<T, ResilienceError<E>>> + Send + Sync;

/// A deferred, re-invocable unit of async work.
pub struct Operation<T, E> {
    f: Arc<OperationFn<T, E>>,
}

impl<T, E> Clone for Operation<T, E> {
    fn clone(&self) -> Self {
        Self { f: Arc::clone(&self.f) }
    }
}

impl<T, E> fmt::Debug for Operation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Operation")
    }
}

impl<T, E> Operation<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Wrap a closure producing a future of `Result<T, ResilienceError<E>>`.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ResilienceError<E>>> + Send + 'static,
    {
        Self { f: Arc::new(move || Box::pin(f()) as BoxFuture<'static, _>) }
    }

    /// Wrap a closure whose future fails with a plain `E`.
    pub fn from_result_fn<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::new(move || {
            let fut = f();
            async move { fut.await.map_err(ResilienceError::Inner) }
        })
    }

    /// Wrap synchronous, possibly blocking work.
    ///
    /// Each invocation runs on tokio's blocking pool. A timeout cannot interrupt such work:
    /// it keeps running after the caller has been answered. The slots of enclosing bulkheads
    /// stay taken until the closure returns.
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new(move || {
            let f = Arc::clone(&f);
            async move {
                let held = HeldSlots::current();
                let work = tokio::task::spawn_blocking(move || {
                    let _held = held;
                    f()
                });
                match work.await {
                    Ok(result) => result.map_err(ResilienceError::Inner),
                    Err(join) if join.is_panic() => {
                        Err(ResilienceError::Panicked(panic_message(join.into_panic().as_ref())))
                    }
                    Err(join) => Err(ResilienceError::Panicked(join.to_string())),
                }
            }
        })
    }

    /// Start one invocation.
    ///
    /// A panic of the operation, while building its future or while polling it, is answered
    /// as `ResilienceError::Panicked`.
    pub fn call(&self) -> BoxFuture<'static, Result<T, ResilienceError<E>>> {
        match catch_unwind(AssertUnwindSafe(|| (self.f)())) {
            Ok(fut) => AssertUnwindSafe(fut)
                .catch_unwind()
                .map(|outcome| {
                    outcome.unwrap_or_else(|payload| {
                        Err(ResilienceError::Panicked(panic_message(payload.as_ref())))
                    })
                })
                .boxed(),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                Box::pin(async move { Err(ResilienceError::Panicked(message)) })
            }
        }
    }
}

/// A composable wrapper enforcing one resilience concern around an operation.
#[async_trait]
pub trait Policy<T, E>: Send + Sync + fmt::Debug
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Run `operation` under this policy.
    async fn execute(&self, operation: Operation<T, E>) -> Result<T, ResilienceError<E>>;

    /// Short name used in log events.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T, E, P> Policy<T, E> for Arc<P>
where
    T: Send + 'static,
    E: Send + 'static,
    P: Policy<T, E> + ?Sized,
{
    async fn execute(&self, operation: Operation<T, E>) -> Result<T, ResilienceError<E>> {
        (**self).execute(operation).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Conveniences available on every policy.
pub trait PolicyExt<T, E>: Policy<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Execute a closure returning a future, without building an [`Operation`] by hand.
    fn run<F, Fut>(&self, f: F) -> BoxFuture<'_, Result<T, ResilienceError<E>>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ResilienceError<E>>> + Send + 'static,
    {
        self.execute(Operation::new(f))
    }

    /// `self` wraps `next`: the composite runs `self` outermost.
    fn then<P>(self, next: P) -> Composite<T, E>
    where
        Self: Sized + Into<Composite<T, E>>,
        P: Into<Composite<T, E>>,
    {
        let head: Composite<T, E> = self.into();
        head + next
    }
}

impl<T, E, P> PolicyExt<T, E> for P
where
    T: Send + 'static,
    E: Send + 'static,
    P: Policy<T, E> + ?Sized,
{
}
