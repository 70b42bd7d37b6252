//! Composition of policies.
//!
//! A [`Composite`] is an ordered list of policies. The first policy is the outermost: it
//! wraps everything after it and sees their combined effect.
//!
//! - `composite + policy` appends, flattening nested composites, so grouping does not matter:
//!   `(a + b) + c` and `a + (b + c)` produce the same list `[a, b, c]`.
//! - `policy.then(next)` starts a composite from any single policy.
//! - Execution is order sensitive: a fallback outside a retry substitutes once the retries are
//!   exhausted, while a fallback inside a retry hides every failure from it.
//!
//! ```rust
//! use std::time::Duration;
//! use kitchen_resilience::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline: Composite<u32, String> = TimeoutPolicy::new(Duration::from_secs(2))?
//!     .then(RetryPolicy::builder().max_attempts(2).build()?)
//!     + FallbackPolicy::value(0);
//! assert_eq!(pipeline.names(), vec!["timeout", "retry", "fallback"]);
//! # Ok(())
//! # }
//! ```
//!
//! # Time budgets
//!
//! Budgets are not propagated between composed policies. Each policy measures its own time
//! from when it is entered: a timeout nested inside a retry bounds every attempt separately,
//! and an outer timeout does not shorten the acquire wait of an inner bulkhead. Order the
//! policies with that in mind.

use crate::{Operation, Policy, ResilienceError};
use async_trait::async_trait;
use std::fmt;
use std::ops::Add;
use std::sync::Arc;

/// Ordered list of policies applied as nested wrappers, first policy outermost.
pub struct Composite<T, E> {
    policies: Vec<Arc<dyn Policy<T, E>>>,
}

impl<T, E> Clone for Composite<T, E> {
    fn clone(&self) -> Self {
        Self { policies: self.policies.clone() }
    }
}

impl<T, E> Default for Composite<T, E> {
    fn default() -> Self {
        Self { policies: Vec::new() }
    }
}

impl<T, E> fmt::Debug for Composite<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.policies.iter()).finish()
    }
}

impl<T, E> Composite<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// An empty composite runs the operation as is.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single<P>(policy: P) -> Self
    where
        P: Policy<T, E> + 'static,
    {
        Self { policies: vec![Arc::new(policy)] }
    }

    /// Build from a list of policies, flattening any that are composites.
    pub fn from_policies<I, P>(policies: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Composite<T, E>>,
    {
        policies.into_iter().fold(Self::new(), |acc, p| acc + p)
    }

    /// Append `policy` as the new innermost layer.
    pub fn push<P>(&mut self, policy: P)
    where
        P: Into<Composite<T, E>>,
    {
        self.policies.extend(policy.into().policies);
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// The policies, outermost first.
    pub fn policies(&self) -> &[Arc<dyn Policy<T, E>>] {
        &self.policies
    }

    /// Policy names, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.policies.iter().map(|p| p.name()).collect()
    }
}

fn wrap<T, E>(policy: Arc<dyn Policy<T, E>>, inner: Operation<T, E>) -> Operation<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    Operation::new(move || {
        let policy = Arc::clone(&policy);
        let inner = inner.clone();
        async move { policy.execute(inner).await }
    })
}

#[async_trait]
impl<T, E> Policy<T, E> for Composite<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    async fn execute(&self, operation: Operation<T, E>) -> Result<T, ResilienceError<E>> {
        let Some((outermost, rest)) = self.policies.split_first() else {
            return operation.call().await;
        };
        let inner = rest.iter().rev().fold(operation, |op, policy| wrap(Arc::clone(policy), op));
        outermost.execute(inner).await
    }

    fn name(&self) -> &'static str {
        "composite"
    }
}

impl<T, E, P> Add<P> for Composite<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    P: Into<Composite<T, E>>,
{
    type Output = Composite<T, E>;

    fn add(mut self, rhs: P) -> Self::Output {
        self.push(rhs);
        self
    }
}

impl<T, E> From<Arc<dyn Policy<T, E>>> for Composite<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn from(policy: Arc<dyn Policy<T, E>>) -> Self {
        Self { policies: vec![policy] }
    }
}

impl<T, E> From<Vec<Arc<dyn Policy<T, E>>>> for Composite<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn from(policies: Vec<Arc<dyn Policy<T, E>>>) -> Self {
        Self { policies }
    }
}
