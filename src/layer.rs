//! Tower integration: run any [`Policy`] around a `tower::Service`.
//!
//! Each attempt clones the inner service and the request and drives them with
//! [`ServiceExt::oneshot`], so a retry re-sends the original request and the inner service
//! readiness is awaited per attempt. Service errors are converted into the policy error type
//! with `Into`.
//!
//! ```rust
//! use kitchen_resilience::layer::PolicyLayer;
//! use kitchen_resilience::presets;
//! use tower::{service_fn, ServiceBuilder, ServiceExt};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let svc = ServiceBuilder::new()
//!     .layer(PolicyLayer::new(presets::database::<String, String>()))
//!     .service(service_fn(|id: u32| async move { Ok::<_, String>(format!("recipe {id}")) }));
//! assert_eq!(svc.oneshot(7).await.unwrap(), "recipe 7");
//! # });
//! ```

use crate::{Operation, Policy, ResilienceError};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::ServiceExt;
use tower_layer::Layer;
use tower_service::Service;

/// A layer wrapping services in a policy.
pub struct PolicyLayer<T, E> {
    policy: Arc<dyn Policy<T, E>>,
}

impl<T, E> PolicyLayer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new<P>(policy: P) -> Self
    where
        P: Policy<T, E> + 'static,
    {
        Self { policy: Arc::new(policy) }
    }

    /// Share an existing policy object, e.g. one bulkhead across several services.
    pub fn from_shared(policy: Arc<dyn Policy<T, E>>) -> Self {
        Self { policy }
    }
}

impl<T, E> Clone for PolicyLayer<T, E> {
    fn clone(&self) -> Self {
        Self { policy: Arc::clone(&self.policy) }
    }
}

impl<T, E> fmt::Debug for PolicyLayer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyLayer").field("policy", &self.policy).finish()
    }
}

impl<S, T, E> Layer<S> for PolicyLayer<T, E> {
    type Service = PolicyService<S, T, E>;

    fn layer(&self, service: S) -> Self::Service {
        PolicyService { inner: service, policy: Arc::clone(&self.policy) }
    }
}

/// Middleware service produced by [`PolicyLayer`].
pub struct PolicyService<S, T, E> {
    inner: S,
    policy: Arc<dyn Policy<T, E>>,
}

impl<S: Clone, T, E> Clone for PolicyService<S, T, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), policy: Arc::clone(&self.policy) }
    }
}

impl<S: fmt::Debug, T, E> fmt::Debug for PolicyService<S, T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyService")
            .field("inner", &self.inner)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<S, Req, T, E> Service<Req> for PolicyService<S, T, E>
where
    S: Service<Req, Response = T> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    S::Error: Into<E>,
    Req: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Response = T;
    type Error = ResilienceError<E>;
    type Future = BoxFuture<'static, Result<T, ResilienceError<E>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // readiness of the inner service is awaited per attempt
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let inner = self.inner.clone();
        let policy = Arc::clone(&self.policy);
        let operation = Operation::new(move || {
            let svc = inner.clone();
            let req = req.clone();
            async move { svc.oneshot(req).await.map_err(|e| ResilienceError::Inner(e.into())) }
        });
        Box::pin(async move { policy.execute(operation).await })
    }
}
