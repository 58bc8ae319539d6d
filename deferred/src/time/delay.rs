use crate::error::Error;
use crate::handle::Handle;
use crate::runtime::scheduler::Scheduler;

use std::time::{Duration, Instant};

impl Scheduler {
    /// Returns a handle that completes successfully once `duration` has
    /// elapsed.
    ///
    /// The wait happens on the scheduler's timer thread, not on a worker.
    /// A zero duration yields an already-completed handle.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferred::Scheduler;
    /// use std::time::{Duration, Instant};
    ///
    /// let scheduler = Scheduler::builder().worker_threads(1).build();
    ///
    /// let start = Instant::now();
    /// scheduler.delay(Duration::from_millis(20)).block_until_complete().unwrap();
    /// assert!(start.elapsed() >= Duration::from_millis(20));
    /// ```
    pub fn delay(&self, duration: Duration) -> Handle {
        if duration.is_zero() {
            return Handle::completed(self);
        }

        let handle = self.handle();
        self.timer().schedule(Instant::now() + duration, handle.clone());

        handle
    }

    /// Like [`delay`](Self::delay), with the duration given as a signed
    /// number of milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalArgument`] if `millis` is negative.
    pub fn delay_millis(&self, millis: i64) -> Result<Handle, Error> {
        let millis = u64::try_from(millis).map_err(|_| {
            Error::IllegalArgument(format!("delay must not be negative, got {millis} ms"))
        })?;

        Ok(self.delay(Duration::from_millis(millis)))
    }
}
