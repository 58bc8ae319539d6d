use crate::error::{BoxError, Error};
use crate::handle::Handle;
use crate::runtime::context::Snapshot;
use crate::runtime::scheduler::Scheduler;

use parking_lot::Mutex;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, Wake, Waker};

/// Task is idle: polled at least once, waiting for a wake-up.
const IDLE: usize = 0;

/// Task is queued on the scheduler.
const QUEUED: usize = 1;

/// Task is being polled by a worker. At most one worker observes this.
const RUNNING: usize = 2;

/// Task was woken while running and must be polled again afterwards.
const NOTIFIED: usize = 3;

/// The future returned `Poll::Ready` and will not be polled again.
const COMPLETED: usize = 4;

type BoxFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'static>>;

/// Conversion of a spawned future's output into a handle outcome.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<(), Error>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), Error> {
        Ok(())
    }
}

impl<E> IntoOutcome for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Result<(), Error> {
        self.map_err(|error| Error::from_boxed(error.into()))
    }
}

/// A spawned future driven by the scheduler.
///
/// Every poll is a separate work item. The waker re-queues the task; the
/// state machine guarantees the future is polled by one worker at a time
/// and that a wake-up arriving mid-poll is not lost.
struct Task {
    /// `None` once the future has completed.
    future: Mutex<Option<BoxFuture>>,

    /// Lifecycle state (IDLE, QUEUED, ...).
    state: AtomicUsize,

    /// Context captured at spawn time, restored around every poll.
    snapshot: Option<Snapshot>,

    scheduler: Scheduler,

    /// Completed with the future's outcome.
    handle: Handle,
}

impl Task {
    fn schedule(self: Arc<Self>) {
        let scheduler = self.scheduler.clone();
        let snapshot = self.snapshot.clone();

        scheduler.dispatch(Box::new(move || self.run()), snapshot);
    }

    /// Polls the future once.
    fn run(self: Arc<Self>) {
        if self
            .state
            .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let waker = Waker::from(self.clone());
        let mut cx = Context::from_waker(&waker);

        let poll = {
            let mut slot = self.future.lock();

            match slot.as_mut() {
                Some(future) => {
                    let poll = panic::catch_unwind(AssertUnwindSafe(|| {
                        future.as_mut().poll(&mut cx)
                    }))
                    .unwrap_or_else(|payload| Poll::Ready(Err(Error::from_panic(payload))));

                    if poll.is_ready() {
                        *slot = None;
                    }

                    poll
                }
                None => return,
            }
        };

        match poll {
            Poll::Pending => {
                // Back to IDLE unless a wake-up arrived while polling.
                if self
                    .state
                    .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    self.state.store(QUEUED, Ordering::Release);
                    self.schedule();
                }
            }
            Poll::Ready(result) => {
                self.state.store(COMPLETED, Ordering::Release);
                self.handle.settle(result);
            }
        }
    }
}

impl Wake for Task {
    fn wake(self: Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.schedule();
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                // Already queued, already notified, or finished.
                _ => return,
            }
        }
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.clone().wake();
    }
}

impl Scheduler {
    /// Spawns a future onto the scheduler and returns a handle for its
    /// outcome.
    ///
    /// The future may `.await` other handles. Its output is either `()` or
    /// a `Result<(), E>`; an `Err` or a panic becomes the handle's failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferred::Scheduler;
    /// use std::time::Duration;
    ///
    /// let scheduler = Scheduler::builder().worker_threads(2).build();
    /// let timers = scheduler.clone();
    ///
    /// let handle = scheduler.spawn(async move {
    ///     for _ in 0..3 {
    ///         timers.delay(Duration::from_millis(1)).await?;
    ///     }
    ///     Ok::<(), deferred::Error>(())
    /// });
    ///
    /// handle.block_until_complete().unwrap();
    /// ```
    pub fn spawn<F>(&self, future: F) -> Handle
    where
        F: Future + Send + 'static,
        F::Output: IntoOutcome,
    {
        let handle = self.handle();

        let task = Arc::new(Task {
            future: Mutex::new(Some(Box::pin(async move { future.await.into_outcome() }))),
            state: AtomicUsize::new(QUEUED),
            snapshot: self.capture(),
            scheduler: self.clone(),
            handle: handle.clone(),
        });

        task.schedule();

        handle
    }

    /// Runs a future to completion, blocking the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Panicked`] if the future panicked.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferred::Scheduler;
    ///
    /// let scheduler = Scheduler::builder().worker_threads(1).build();
    /// let value = scheduler.block_on(async { 40 + 2 }).unwrap();
    /// assert_eq!(value, 42);
    /// ```
    pub fn block_on<F>(&self, future: F) -> Result<F::Output, Error>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let slot = Arc::new(Mutex::new(None));
        let output = slot.clone();

        self.spawn(async move {
            *output.lock() = Some(future.await);
        })
        .block_until_complete()?;

        slot.lock().take().ok_or(Error::IllegalState)
    }
}
