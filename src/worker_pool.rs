//! Fixed-concurrency worker pool
//!
//! Owns a dedicated multi-threaded tokio runtime. Submitted tasks are
//! fire-and-forget: they queue without bound and at most `pool_size` of them
//! run at once. There is no cancellation; the runtime is torn down only when
//! the pool itself is dropped.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::config::WorkerConfig;
use crate::errors::{LoaderError, LoaderResult};

/// Bounded executor for background load tasks
pub struct WorkerPool {
    runtime: Option<Runtime>,
    handle: Handle,
    permits: Arc<Semaphore>,
    pool_size: usize,
    queued: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(config: &WorkerConfig) -> LoaderResult<Self> {
        if config.pool_size == 0 {
            return Err(LoaderError::configuration(
                "workers.pool_size must be greater than zero",
            ));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(config.pool_size)
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();

        info!(
            "Started worker pool with {} workers ({})",
            config.pool_size, config.thread_name
        );

        Ok(Self {
            runtime: Some(runtime),
            handle,
            permits: Arc::new(Semaphore::new(config.pool_size)),
            pool_size: config.pool_size,
            queued: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Queue a task. Returns immediately; the task runs once a worker slot
    /// frees up.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let queued = Arc::clone(&self.queued);
        let in_flight = Arc::clone(&self.in_flight);

        queued.fetch_add(1, Ordering::Relaxed);
        self.handle.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                queued.fetch_sub(1, Ordering::Relaxed);
                return;
            };
            queued.fetch_sub(1, Ordering::Relaxed);
            let _running = RunningGuard::enter(in_flight);
            task.await;
        });
        debug!(
            "Task submitted (queued: {}, in flight: {})",
            self.queued(),
            self.in_flight()
        );
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Tasks submitted but not yet started
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    /// Tasks currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            // Non-blocking, so dropping from inside another runtime is fine
            runtime.shutdown_background();
        }
    }
}

/// Keeps the in-flight count right even if a task panics
struct RunningGuard(Arc<AtomicUsize>);

impl RunningGuard {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}
