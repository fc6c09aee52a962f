//! Bounded worker pool for backing sub-calls.
//!
//! Backing adapters are synchronous and block on host I/O, so every sub-call
//! runs on tokio's blocking thread pool. A semaphore caps how many sub-calls
//! of one mount run at once, and a task tracker lets the mount wait for all
//! in-flight sub-calls when it is torn down.
//!
//! # Lifecycle
//!
//! ```text
//! DispatchPool::new(roots, factor)      capacity = roots * factor
//!        │
//!        ▼
//!   run(task) ──► acquire permit ──► spawn_blocking(task) ──► Outcome
//!        │
//!        ▼
//!   shutdown() ──► close tracker ──► wait for in-flight ──► close permits
//!                                                           (later runs fail
//!                                                            with PoolClosed)
//! ```

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use super::outcome::Outcome;
use crate::error::UnionError;

// =============================================================================
// Configuration Constants
// =============================================================================

/// Default number of concurrent sub-calls allowed per backing root.
pub const DEFAULT_THREADS_PER_ROOT: usize = 10;

// =============================================================================
// Dispatch Pool
// =============================================================================

/// Per-mount bounded pool that runs blocking backing calls.
#[derive(Debug)]
pub struct DispatchPool {
    /// Limits concurrent sub-calls
    permits: Arc<Semaphore>,
    /// Tracks in-flight sub-calls for the shutdown drain
    tracker: TaskTracker,
    /// Total permits
    capacity: usize,
}

impl DispatchPool {
    /// Create a pool sized for `roots` backing roots.
    ///
    /// # Arguments
    ///
    /// * `roots` - Number of backing roots of the mount
    /// * `factor` - Concurrent sub-calls allowed per root
    pub fn new(roots: usize, factor: usize) -> Self {
        let capacity = roots.saturating_mul(factor).max(1);
        debug!(roots, factor, capacity, "Dispatch pool created");
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            tracker: TaskTracker::new(),
            capacity,
        }
    }

    /// Maximum number of concurrent sub-calls.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of sub-calls currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.permits.available_permits())
    }

    /// Whether [`shutdown`](Self::shutdown) has started.
    pub fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Run one blocking sub-call on the pool and wait for its outcome.
    ///
    /// Waits for a permit when the pool is at capacity. Once started, the
    /// sub-call runs to completion even if the returned future is dropped.
    pub async fn run<T, F>(&self, task: F) -> Outcome<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Outcome<T> + Send + 'static,
    {
        // The token keeps shutdown waiting from this point on.
        let token = self.tracker.token();
        if self.tracker.is_closed() {
            return Outcome::Failure(UnionError::PoolClosed);
        }

        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return Outcome::Failure(UnionError::PoolClosed),
        };

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _token = token;
            task()
        });

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failure(UnionError::TaskPanicked(e.to_string())),
        }
    }

    /// Stop accepting sub-calls and wait for every in-flight one to finish.
    pub async fn shutdown(&self) {
        if self.tracker.is_closed() {
            return;
        }
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            info!(pending, "Draining dispatch pool");
        }
        self.tracker.wait().await;
        self.permits.close();
        info!("Dispatch pool drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_capacity_is_roots_times_factor() {
        assert_eq!(DispatchPool::new(3, 10).capacity(), 30);
        assert_eq!(DispatchPool::new(2, 1).capacity(), 2);
    }

    #[test]
    fn test_capacity_never_zero() {
        assert_eq!(DispatchPool::new(0, 10).capacity(), 1);
        assert_eq!(DispatchPool::new(4, 0).capacity(), 1);
    }

    #[tokio::test]
    async fn test_run_returns_outcome() {
        let pool = DispatchPool::new(1, 1);
        let outcome = pool.run(|| Outcome::Success(42)).await;
        assert_eq!(outcome, Outcome::Success(42));
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_is_failure() {
        let pool = DispatchPool::new(1, 1);
        let outcome: Outcome<()> = pool.run(|| panic!("boom")).await;
        assert!(matches!(
            outcome,
            Outcome::Failure(UnionError::TaskPanicked(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_bounded_by_capacity() {
        let pool = Arc::new(DispatchPool::new(2, 1));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = Arc::clone(&pool);
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                pool.run(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Outcome::Success(())
                })
                .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Outcome::Success(()));
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_drains_in_flight() {
        let pool = Arc::new(DispatchPool::new(1, 2));
        let finished = Arc::new(AtomicUsize::new(0));

        let task_pool = Arc::clone(&pool);
        let task_finished = Arc::clone(&finished);
        let handle = tokio::spawn(async move {
            task_pool
                .run(move || {
                    std::thread::sleep(Duration::from_millis(100));
                    task_finished.fetch_add(1, Ordering::SeqCst);
                    Outcome::Success(())
                })
                .await
        });

        // Let the sub-call start.
        while pool.in_flight() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        pool.shutdown().await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(handle.await.unwrap(), Outcome::Success(()));
    }

    #[tokio::test]
    async fn test_run_after_shutdown_is_pool_closed() {
        let pool = DispatchPool::new(1, 1);
        pool.shutdown().await;
        assert!(pool.is_closed());

        let outcome = pool.run(|| Outcome::Success(1)).await;
        assert_eq!(outcome, Outcome::Failure(UnionError::PoolClosed));
    }
}
