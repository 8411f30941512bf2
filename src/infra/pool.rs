//! Bounded worker pool shared by identity resolution and channel scanning
//!
//! The pool is a FIFO semaphore with a fixed number of permits. Leaf work
//! (one remote call) runs under a permit; coordinating tasks that issue
//! several leaf calls are fanned out with `scatter` and take permits only
//! around their own remote calls, so nested fan-out can never starve itself.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run one unit of work while holding a permit
    pub async fn run<F>(&self, work: F) -> F::Output
    where
        F: Future,
    {
        // The semaphore is never closed, acquire only fails after close().
        let _permit = self.permits.acquire().await.ok();
        work.await
    }

    /// Submit every unit of work to the pool and wait for all of them
    ///
    /// Results come back in completion order. A panicked task is logged and
    /// left out of the result.
    pub async fn submit_all<I, F, T>(&self, works: I) -> Vec<T>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut set = JoinSet::new();
        for work in works {
            let pool = self.clone();
            set.spawn(async move { pool.run(work).await });
        }
        join_all(set).await
    }

    /// Fan out coordinating tasks without holding permits and gather them
    pub async fn scatter<I, F, T>(&self, works: I) -> Vec<T>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut set = JoinSet::new();
        for work in works {
            set.spawn(work);
        }
        join_all(set).await
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(10)
    }
}

async fn join_all<T: Send + 'static>(mut set: JoinSet<T>) -> Vec<T> {
    let mut results = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(value) => results.push(value),
            Err(e) => warn!(error = %e, "Pool task failed"),
        }
    }
    results
}
