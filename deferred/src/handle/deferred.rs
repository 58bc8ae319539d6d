use super::state::{Continuation, OnComplete, Outcome, State};
use crate::error::Error;
use crate::runtime::scheduler::Scheduler;

use parking_lot::Mutex;
use std::fmt;
use std::mem;
use std::sync::Arc;
use tracing::{trace, warn};

/// A single-assignment handle to a deferred computation.
///
/// A handle starts pending and reaches exactly one terminal state: success
/// or failure. Continuations attached to it run on its [`Scheduler`] once
/// that happens, never inline on the thread that completes the handle or
/// attaches the continuation.
///
/// `Handle` is a cheap `Clone`; every clone refers to the same state.
///
/// # Examples
///
/// ```rust
/// use deferred::Scheduler;
///
/// let scheduler = Scheduler::builder().worker_threads(2).build();
/// let handle = scheduler.handle();
///
/// let next = handle.chain(|| {
///     println!("handle completed");
///     Ok(())
/// });
///
/// handle.complete_success().unwrap();
/// next.block_until_complete().unwrap();
/// ```
#[derive(Clone)]
pub struct Handle {
    pub(crate) shared: Arc<Shared>,
}

pub(crate) struct Shared {
    /// Per-handle lock; there is no lock spanning several handles.
    state: Mutex<State>,

    /// Scheduler running this handle's continuations.
    scheduler: Scheduler,
}

impl Handle {
    /// Creates a pending handle whose continuations run on `scheduler`.
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                scheduler: scheduler.clone(),
            }),
        }
    }

    /// Creates a handle that has already completed successfully.
    pub fn completed(scheduler: &Scheduler) -> Self {
        let handle = Self::new(scheduler);
        handle.shared.state.lock().outcome = Some(Outcome::Success);
        handle
    }

    /// Creates a handle that has already failed with `error`.
    pub fn failed(scheduler: &Scheduler, error: Error) -> Self {
        let handle = Self::new(scheduler);
        handle.shared.state.lock().outcome = Some(Outcome::Failure(error));
        handle
    }

    /// Returns the scheduler this handle dispatches to.
    pub fn scheduler(&self) -> &Scheduler {
        &self.shared.scheduler
    }

    /// Returns `true` once the handle has reached a terminal state.
    pub fn is_completed(&self) -> bool {
        self.shared.state.lock().outcome.is_some()
    }

    /// Returns the terminal state, or `None` while pending.
    pub fn outcome(&self) -> Option<Result<(), Error>> {
        self.shared
            .state
            .lock()
            .outcome
            .as_ref()
            .map(Outcome::to_result)
    }

    /// Completes the handle successfully.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] if the handle already completed.
    pub fn complete_success(&self) -> Result<(), Error> {
        self.complete(Outcome::Success)
    }

    /// Completes the handle with `error`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] if the handle already completed.
    pub fn complete_failure(&self, error: Error) -> Result<(), Error> {
        self.complete(Outcome::Failure(error))
    }

    fn complete(&self, outcome: Outcome) -> Result<(), Error> {
        let (continuations, result) = {
            let mut state = self.shared.state.lock();

            if state.outcome.is_some() {
                return Err(Error::IllegalState);
            }

            let result = outcome.to_result();
            state.outcome = Some(outcome);

            (mem::take(&mut state.continuations), result)
        };

        // The outcome is final, so dispatching outside the lock cannot race
        // with another completion; attachers arriving now dispatch directly.
        trace!(
            continuations = continuations.len(),
            success = result.is_ok(),
            "handle completed"
        );

        for continuation in continuations {
            self.dispatch(continuation, result.clone());
        }

        Ok(())
    }

    /// Attaches a continuation that runs once the handle completes.
    ///
    /// The caller's ambient context is captured now and restored while the
    /// continuation runs. If the handle has already completed, the
    /// continuation is dispatched to the scheduler immediately.
    pub fn attach_continuation<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_complete(move |_| callback());
    }

    /// Like [`attach_continuation`](Self::attach_continuation), but the
    /// callback receives the outcome.
    pub(crate) fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(Result<(), Error>) + Send + 'static,
    {
        let continuation = Continuation {
            callback: Box::new(callback) as OnComplete,
            snapshot: self.shared.scheduler.capture(),
        };

        let result = {
            let mut state = self.shared.state.lock();

            match state.outcome.as_ref().map(Outcome::to_result) {
                Some(result) => result,
                None => {
                    state.continuations.push(continuation);
                    return;
                }
            }
        };

        self.dispatch(continuation, result);
    }

    fn dispatch(&self, continuation: Continuation, result: Result<(), Error>) {
        let Continuation { callback, snapshot } = continuation;

        self.shared
            .scheduler
            .dispatch(Box::new(move || callback(result)), snapshot);
    }

    /// Blocks the calling thread until the handle completes.
    ///
    /// # Errors
    ///
    /// Returns the stored failure if the handle failed. The error is the
    /// very value the handle was failed with, not a copy or a wrapper.
    ///
    /// Calling this from a worker of the handle's own scheduler can
    /// deadlock if no other worker is free to run the wake-up.
    pub fn block_until_complete(&self) -> Result<(), Error> {
        if !self.is_completed() {
            let (signal, wait) = crossbeam_channel::bounded::<()>(1);

            self.attach_continuation(move || {
                let _ = signal.send(());
            });

            // A disconnect means the executor dropped the wake-up unrun,
            // which only happens after the handle has completed.
            let _ = wait.recv();
        }

        match self.outcome() {
            Some(result) => result,
            None => Err(Error::IllegalState),
        }
    }

    /// Completes the handle from inside a combinator.
    ///
    /// Losing the race against a manual completion is logged, not
    /// propagated: the combinator has nobody to report it to.
    pub(crate) fn settle(&self, result: Result<(), Error>) {
        if let Err(error) = self.complete(Outcome::from_result(result)) {
            warn!(%error, "combinator result handle was completed elsewhere");
        }
    }

    /// Returns `true` if both values refer to the same handle.
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();

        f.debug_struct("Handle")
            .field("outcome", &state.outcome)
            .field("continuations", &state.continuations.len())
            .finish()
    }
}
