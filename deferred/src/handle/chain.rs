use super::Handle;
use crate::error::{BoxError, guard};

impl Handle {
    /// Runs `action` after this handle succeeds and returns a handle for
    /// the combined sequence.
    ///
    /// - If `action` returns an error or panics, the returned handle fails
    ///   with that error.
    /// - If this handle fails, `action` does not run and the returned
    ///   handle fails with the same error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferred::Scheduler;
    /// use std::time::Duration;
    ///
    /// let scheduler = Scheduler::builder().worker_threads(2).build();
    ///
    /// scheduler
    ///     .delay(Duration::from_millis(5))
    ///     .chain(|| {
    ///         println!("Hello,");
    ///         Ok(())
    ///     })
    ///     .chain(|| {
    ///         println!("World!");
    ///         Ok(())
    ///     })
    ///     .block_until_complete()
    ///     .unwrap();
    /// ```
    pub fn chain<F>(&self, action: F) -> Handle
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        let next = Handle::new(self.scheduler());
        let target = next.clone();

        self.on_complete(move |outcome| {
            let result = outcome.and_then(|()| guard(action));
            target.settle(result);
        });

        next
    }

    /// Runs `action` after this handle succeeds; `action` starts another
    /// asynchronous operation and returns its handle.
    ///
    /// The returned handle stays pending until that inner handle completes
    /// and then takes its outcome unchanged. No thread blocks while
    /// waiting.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferred::Scheduler;
    /// use std::time::Duration;
    ///
    /// let scheduler = Scheduler::builder().worker_threads(2).build();
    /// let inner = scheduler.clone();
    ///
    /// scheduler
    ///     .delay(Duration::from_millis(5))
    ///     .chain_async(move || Ok(inner.delay(Duration::from_millis(5))))
    ///     .block_until_complete()
    ///     .unwrap();
    /// ```
    pub fn chain_async<F>(&self, action: F) -> Handle
    where
        F: FnOnce() -> Result<Handle, BoxError> + Send + 'static,
    {
        let next = Handle::new(self.scheduler());
        let target = next.clone();

        self.on_complete(move |outcome| match outcome.and_then(|()| guard(action)) {
            Ok(inner) => inner.on_complete(move |outcome| target.settle(outcome)),
            Err(error) => target.settle(Err(error)),
        });

        next
    }
}
