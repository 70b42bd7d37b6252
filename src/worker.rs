//! Process-wide worker pool used by [`TimeoutPolicy`](crate::TimeoutPolicy).
//!
//! A timed operation runs on a task of this pool while the caller only waits on its join
//! handle, so the caller can stop waiting when the deadline passes.
//!
//! # Process-wide state
//!
//! The pool is the one piece of shared mutable state of the policy framework. It is a
//! multi-thread tokio runtime with a bounded number of worker and blocking threads, built
//! lazily on first use and never torn down: it lives as long as the process. If it cannot
//! be built, timed operations are spawned on the runtime of the caller instead.

use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

const MAX_WORKERS: usize = 32;
const MAX_BLOCKING_THREADS: usize = 64;

fn worker_count() -> usize {
    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    (cpus + 4).min(MAX_WORKERS)
}

fn pool() -> Option<&'static Runtime> {
    static POOL: OnceLock<Option<Runtime>> = OnceLock::new();
    POOL.get_or_init(|| {
        match Builder::new_multi_thread()
            .worker_threads(worker_count())
            .max_blocking_threads(MAX_BLOCKING_THREADS)
            .thread_name("kitchen-policy-worker")
            .enable_all()
            .build()
        {
            Ok(rt) => {
                tracing::debug!(workers = worker_count(), "started shared policy worker pool");
                Some(rt)
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not start shared worker pool; using the caller's runtime");
                None
            }
        }
    })
    .as_ref()
}

/// Handle to the shared pool, or to the caller's runtime when the pool is unavailable.
///
/// # Panics
///
/// Panics when the pool is unavailable and the caller is not inside a tokio runtime.
pub fn handle() -> Handle {
    match pool() {
        Some(rt) => rt.handle().clone(),
        None => Handle::current(),
    }
}

/// Spawn `fut` on the shared pool.
pub fn spawn<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    handle().spawn(fut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_is_bounded() {
        let n = worker_count();
        assert!(n >= 5);
        assert!(n <= MAX_WORKERS);
    }

    #[tokio::test]
    async fn spawned_work_runs_on_named_pool_threads() {
        let name = spawn(async { std::thread::current().name().map(str::to_string) })
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("kitchen-policy-worker"));
    }

    #[test]
    fn pool_is_shared_across_calls() {
        let a = pool().map(|rt| rt as *const Runtime);
        let b = pool().map(|rt| rt as *const Runtime);
        assert_eq!(a, b);
    }
}
