//! Bounded worker pool shared by every analysis.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::GitCommand;
use crate::error::CommandError;

/// A counting semaphore around process spawning and blocking work.
///
/// Cloning is cheap and every clone draws from the same permits, so one pool
/// caps the number of simultaneous `git` processes across all concurrent
/// analyses. No ordering is guaranteed between unrelated callers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool with `size` permits (at least one).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Number of permits this pool was created with.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Number of permits not currently held.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs `command` while holding a permit.
    pub async fn run(&self, command: GitCommand) -> Result<Vec<u8>, CommandError> {
        let _permit = self.acquire().await?;
        command.output().await
    }

    /// Runs blocking work on the blocking thread pool while holding a permit.
    ///
    /// The permit travels with the closure, so it is released only once the
    /// work finishes even if the caller stops waiting.
    pub async fn run_blocking<F, T>(&self, work: F) -> Result<T, CommandError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.acquire().await?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        })
        .await
        .map_err(|e| CommandError::Worker(e.to_string()))
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, CommandError> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| CommandError::Worker(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn new_never_creates_an_empty_pool() {
        assert_eq!(WorkerPool::new(0).size(), 1);
        assert_eq!(WorkerPool::new(4).size(), 4);
    }

    #[tokio::test]
    async fn run_blocking_returns_closure_value_and_releases_permit() {
        let pool = WorkerPool::new(2);
        let value = pool.run_blocking(|| 21 * 2).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn run_blocking_never_exceeds_pool_size() {
        let pool = WorkerPool::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            tasks.spawn(async move {
                pool.run_blocking(move || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            });
        }

        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn run_blocking_reports_panics_as_worker_errors() {
        let pool = WorkerPool::new(1);
        let err = pool.run_blocking(|| -> u32 { panic!("boom") }).await;
        assert!(matches!(err, Err(CommandError::Worker(_))));
        assert_eq!(pool.available(), 1);
    }
}
