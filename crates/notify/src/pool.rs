//! Bounded pool for offloading network-bound notification work.
//!
//! Every submitted task runs on its own tokio task, but at most `size` of them
//! are in flight at once. The submitter awaits the result without blocking
//! anything else on the runtime.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::trace;

use crate::error::PoolError;

/// Default number of concurrent transport calls.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Semaphore-bounded task offload.
#[derive(Debug, Clone)]
pub struct DispatchPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl DispatchPool {
    /// Create a pool running at most `size` tasks at once (minimum 1).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Number of free slots right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `task` on the pool and wait for its output.
    ///
    /// Waits for a free slot first; the slot is held until the task finishes.
    pub async fn submit<F, T>(&self, task: F) -> Result<T, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        trace!(available = self.permits.available_permits(), "dispatch slot acquired");

        let handle = tokio::spawn(async move {
            let output = task.await;
            drop(permit);
            output
        });

        handle.await.map_err(|e| PoolError::Aborted(e.to_string()))
    }
}

impl Default for DispatchPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}
