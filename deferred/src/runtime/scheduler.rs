use crate::error::{BoxError, guard};
use crate::handle::Handle;
use crate::runtime::builder::SchedulerBuilder;
use crate::runtime::context::{Callback, ContextProvider, Snapshot, ThreadContext};
use crate::runtime::executor::{Executor, WorkItem};
use crate::time::timer::{Timer, TimerHandle};

use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

/// Process-wide scheduler returned by [`Scheduler::global`].
static GLOBAL: OnceLock<Scheduler> = OnceLock::new();

thread_local! {
    /// Scheduler whose work item is running on this thread.
    ///
    /// Weak, so a queued item never keeps its own scheduler alive.
    static CURRENT: RefCell<Option<Weak<Inner>>> = const { RefCell::new(None) };
}

/// Runs callbacks for handles and combinators.
///
/// A `Scheduler` pairs an [`Executor`] (where callbacks run) with a
/// [`ContextProvider`] (how ambient context travels with them). It is a
/// cheap, cloneable capability: every [`Handle`] keeps the scheduler it was
/// created with and dispatches its continuations there.
///
/// # Examples
///
/// ```rust
/// use deferred::Scheduler;
///
/// let scheduler = Scheduler::builder().worker_threads(2).build();
///
/// let handle = scheduler.run(|| {
///     println!("running on a worker");
///     Ok(())
/// });
///
/// handle.block_until_complete().unwrap();
/// ```
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    /// Where work items run.
    executor: Arc<dyn Executor>,

    /// How ambient context is captured and restored.
    context: Arc<dyn ContextProvider>,

    /// Timer thread, started on the first non-zero delay.
    timer: OnceLock<TimerHandle>,
}

impl Scheduler {
    /// Creates a scheduler with the default configuration: one worker per
    /// logical CPU and thread-scoped ambient context.
    pub fn new() -> Self {
        SchedulerBuilder::new().build()
    }

    /// Returns a builder for configuring a scheduler.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    /// Returns the process-wide scheduler, creating it on first use.
    ///
    /// It lives for the rest of the process.
    pub fn global() -> &'static Scheduler {
        GLOBAL.get_or_init(Scheduler::new)
    }

    /// Returns the scheduler running the current callback, task or handle
    /// continuation.
    ///
    /// Inside a `#[deferred::main]` or `#[deferred::test]` body this is the
    /// scheduler the attribute built. Returns `None` outside any scheduler.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferred::Scheduler;
    ///
    /// let scheduler = Scheduler::builder().worker_threads(1).build();
    /// assert!(Scheduler::current().is_none());
    ///
    /// let inside = scheduler
    ///     .block_on(async { Scheduler::current() })
    ///     .unwrap()
    ///     .unwrap();
    /// assert!(inside.ptr_eq(&scheduler));
    /// ```
    pub fn current() -> Option<Scheduler> {
        CURRENT
            .with(|slot| slot.borrow().as_ref().and_then(Weak::upgrade))
            .map(|inner| Scheduler { inner })
    }

    /// Creates a scheduler on top of a custom executor, using
    /// [`ThreadContext`] for ambient context.
    pub fn with_executor<E>(executor: Arc<E>) -> Self
    where
        E: Executor,
    {
        Self::from_parts(executor, Arc::new(ThreadContext))
    }

    /// Creates a scheduler from an executor and a context provider.
    pub fn from_parts(executor: Arc<dyn Executor>, context: Arc<dyn ContextProvider>) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor,
                context,
                timer: OnceLock::new(),
            }),
        }
    }

    /// Creates a pending handle bound to this scheduler.
    pub fn handle(&self) -> Handle {
        Handle::new(self)
    }

    /// Captures the caller's ambient context.
    pub fn capture(&self) -> Option<Snapshot> {
        self.inner.context.capture()
    }

    /// Submits a raw callback, carrying the caller's ambient context.
    ///
    /// The callback is not wrapped: if it panics, the panic ends the worker
    /// thread that runs it. Use [`run`](Self::run) to get a handle and have
    /// panics captured instead.
    pub fn submit<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.dispatch(Box::new(callback), self.capture());
    }

    /// Runs `action` on the scheduler and returns a handle for its outcome.
    ///
    /// An error returned by `action`, or a panic inside it, becomes the
    /// handle's failure.
    pub fn run<F>(&self, action: F) -> Handle
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        let handle = self.handle();
        let target = handle.clone();

        self.submit(move || target.settle(guard(action)));

        handle
    }

    /// Queues a callback with an already-captured snapshot.
    pub(crate) fn dispatch(&self, callback: Callback, snapshot: Option<Snapshot>) {
        let owner = Arc::downgrade(&self.inner);
        let callback: Callback = Box::new(move || enter(owner, callback));

        let item = WorkItem::new(callback, snapshot, self.inner.context.clone());
        self.inner.executor.execute(item);
    }

    /// Returns the timer thread, starting it if needed.
    pub(crate) fn timer(&self) -> &TimerHandle {
        self.inner.timer.get_or_init(Timer::start)
    }

    /// Returns `true` if both values refer to the same scheduler.
    pub fn ptr_eq(&self, other: &Scheduler) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Marks `owner` as the current scheduler for the duration of `f`.
fn enter(owner: Weak<Inner>, f: Callback) {
    let previous = CURRENT.with(|slot| slot.replace(Some(owner)));
    let _restore = Restore(previous);

    f();
}

struct Restore(Option<Weak<Inner>>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        let _ = CURRENT.try_with(|slot| slot.replace(previous));
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("timer_started", &self.inner.timer.get().is_some())
            .finish_non_exhaustive()
    }
}
