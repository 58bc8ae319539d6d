use super::context::{ContextProvider, ThreadContext};
use super::executor::ThreadPool;
use super::scheduler::Scheduler;

use std::sync::Arc;
use std::thread;

/// Builder for configuring and creating a [`Scheduler`].
///
/// # Examples
///
/// ```rust
/// use deferred::SchedulerBuilder;
/// use deferred::context::NoContext;
///
/// let scheduler = SchedulerBuilder::new()
///     .worker_threads(4)
///     .thread_name("io-callbacks")
///     .context(NoContext)
///     .build();
/// # drop(scheduler);
/// ```
pub struct SchedulerBuilder {
    /// Number of worker threads in the pool.
    worker_threads: usize,

    /// Prefix used to name worker threads.
    thread_name: String,

    /// Ambient context collaborator.
    context: Arc<dyn ContextProvider>,
}

impl SchedulerBuilder {
    /// Creates a new `SchedulerBuilder` with default configuration.
    ///
    /// By default, the number of worker threads is set to the number
    /// of available logical CPUs, falling back to `1` if unavailable,
    /// and ambient context is propagated with [`ThreadContext`].
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            thread_name: String::from("deferred-worker"),
            context: Arc::new(ThreadContext),
        }
    }

    /// Sets the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Sets the name prefix of worker threads.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Sets the ambient context provider.
    pub fn context<C>(mut self, provider: C) -> Self
    where
        C: ContextProvider,
    {
        self.context = Arc::new(provider);
        self
    }

    /// Spawns the worker pool and returns the scheduler.
    pub fn build(self) -> Scheduler {
        let pool = ThreadPool::new(self.worker_threads, &self.thread_name);

        Scheduler::from_parts(Arc::new(pool), self.context)
    }
}

impl Default for SchedulerBuilder {
    /// Creates a default `SchedulerBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
