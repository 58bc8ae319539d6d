use super::worker::Worker;
use super::{Executor, WorkItem};

use crossbeam_channel::{Sender, unbounded};
use std::thread;
use tracing::{debug, error};

/// A fixed-size pool of worker threads draining one shared queue.
///
/// The queue is an unbounded multi-producer/multi-consumer channel, so
/// submitting never blocks and needs no external locking.
///
/// There is no explicit shutdown: workers exit on their own once the pool
/// (and with it the last sender) has been dropped and the queue is empty.
pub struct ThreadPool {
    /// Sending side of the shared work queue.
    sender: Sender<WorkItem>,

    /// Number of worker threads spawned.
    size: usize,
}

impl ThreadPool {
    /// Spawns a pool of `threads` workers named `"{name}-{index}"`.
    ///
    /// # Panics
    ///
    /// Panics if `threads == 0` or if the OS refuses to spawn a thread.
    pub fn new(threads: usize, name: &str) -> Self {
        assert!(threads > 0, "a thread pool needs at least one worker");

        let (sender, receiver) = unbounded();

        for id in 0..threads {
            let worker = Worker::new(id, receiver.clone());

            thread::Builder::new()
                .name(format!("{name}-{id}"))
                .spawn(move || worker.run())
                .expect("failed to spawn scheduler worker thread");
        }

        debug!(threads, prefix = name, "thread pool started");

        Self {
            sender,
            size: threads,
        }
    }

    /// Returns the number of worker threads the pool was started with.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Executor for ThreadPool {
    fn execute(&self, item: WorkItem) {
        if self.sender.send(item).is_err() {
            // Every worker has died; the item is dropped without running.
            error!("no worker left to run the work item");
        }
    }
}
