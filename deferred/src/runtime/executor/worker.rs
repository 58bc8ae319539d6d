use super::WorkItem;

use crossbeam_channel::Receiver;
use std::thread;
use tracing::{debug, error, trace};

/// A worker thread of the [`ThreadPool`](super::ThreadPool).
///
/// The worker repeatedly performs a blocking dequeue on the shared queue
/// and runs what it gets. It exits once every sender is gone and the queue
/// is drained.
pub(crate) struct Worker {
    /// Index of the worker inside its pool.
    id: usize,

    /// Receiving side of the shared work queue.
    receiver: Receiver<WorkItem>,
}

impl Worker {
    pub(crate) fn new(id: usize, receiver: Receiver<WorkItem>) -> Self {
        Self { id, receiver }
    }

    /// Runs the worker loop.
    ///
    /// A panic raised by a work item is not caught here: it unwinds out of
    /// the loop and ends this worker thread. Wrapped actions (`run`,
    /// `chain`, spawned futures) catch their own panics before they reach
    /// this point.
    pub(crate) fn run(self) {
        let _exit = ExitGuard { id: self.id };

        debug!(worker = self.id, "worker started");

        while let Ok(item) = self.receiver.recv() {
            trace!(worker = self.id, context = item.snapshot().is_some(), "running work item");
            item.run();
        }

        debug!(worker = self.id, "work queue closed, worker exiting");
    }
}

struct ExitGuard {
    id: usize,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(worker = self.id, "worker terminated by a panicking callback");
        }
    }
}
