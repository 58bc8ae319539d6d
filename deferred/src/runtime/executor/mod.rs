//! Executors behind a [`Scheduler`](crate::Scheduler).
//!
//! An executor receives [`WorkItem`]s and runs each of them exactly once.
//! Two implementations ship with the crate:
//! - [`ThreadPool`]: the fixed-size pool of worker threads used in
//!   production,
//! - [`ManualExecutor`]: a queue drained explicitly by the caller, for
//!   deterministic single-threaded tests.

mod manual;
mod pool;
mod worker;

pub use manual::ManualExecutor;
pub use pool::ThreadPool;

use crate::runtime::context::{Callback, ContextProvider, Snapshot};

use std::fmt;
use std::sync::Arc;

/// Accepts work items and runs each one exactly once.
pub trait Executor: Send + Sync + 'static {
    /// Queues `item` for execution.
    ///
    /// Must not run the item inline on the calling thread.
    fn execute(&self, item: WorkItem);
}

/// A callback paired with the ambient context captured for it.
pub struct WorkItem {
    callback: Callback,
    snapshot: Option<Snapshot>,
    context: Arc<dyn ContextProvider>,
}

impl WorkItem {
    pub(crate) fn new(
        callback: Callback,
        snapshot: Option<Snapshot>,
        context: Arc<dyn ContextProvider>,
    ) -> Self {
        Self {
            callback,
            snapshot,
            context,
        }
    }

    /// Returns the snapshot attached to this item, if any.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Runs the callback inside its own context scope.
    ///
    /// An item without a snapshot still gets a fresh, empty scope: whatever
    /// the callback sets is discarded with it and never reaches the next
    /// item on the same thread.
    pub fn run(self) {
        let snapshot = self.snapshot.unwrap_or_default();
        self.context.run_with(snapshot, self.callback);
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}
