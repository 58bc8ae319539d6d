use super::{Executor, WorkItem};

use parking_lot::Mutex;
use std::collections::VecDeque;

/// An executor that only runs work when told to.
///
/// Items are queued in submission order and executed on the thread calling
/// [`run_next`](Self::run_next) or [`run_until_idle`](Self::run_until_idle).
/// This gives tests a deterministic, single-threaded scheduler.
///
/// # Examples
///
/// ```rust
/// use deferred::{ManualExecutor, Scheduler};
/// use std::sync::Arc;
///
/// let executor = Arc::new(ManualExecutor::new());
/// let scheduler = Scheduler::with_executor(executor.clone());
///
/// let handle = scheduler.run(|| Ok(()));
/// assert!(!handle.is_completed());
///
/// executor.run_until_idle();
/// assert!(handle.is_completed());
/// ```
#[derive(Default)]
pub struct ManualExecutor {
    queue: Mutex<VecDeque<WorkItem>>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued items.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs the oldest queued item. Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        // The lock is released before running: items may queue more work.
        let item = self.queue.lock().pop_front();

        match item {
            Some(item) => {
                item.run();
                true
            }
            None => false,
        }
    }

    /// Runs queued items, including ones queued meanwhile, until the queue
    /// is empty. Returns how many items ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;

        while self.run_next() {
            ran += 1;
        }

        ran
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, item: WorkItem) {
        self.queue.lock().push_back(item);
    }
}
