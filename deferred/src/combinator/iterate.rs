use crate::error::{BoxError, guard};
use crate::handle::Handle;
use crate::runtime::scheduler::Scheduler;

use parking_lot::Mutex;
use std::sync::Arc;

/// Drives a sequence of handles one element at a time.
struct Driver<I> {
    sequence: Mutex<I>,
    result: Handle,
}

impl<I> Driver<I>
where
    I: Iterator<Item = Result<Handle, BoxError>> + Send + 'static,
{
    /// Pulls the next element and arranges for the following step.
    ///
    /// The follow-up step is a continuation of the pulled handle, so it
    /// always runs as a fresh work item: the stack does not grow with the
    /// length of the sequence.
    fn step(self: Arc<Self>) {
        let next = guard(|| self.sequence.lock().next().transpose());

        match next {
            Ok(Some(member)) => {
                let driver = self.clone();

                member.on_complete(move |outcome| match outcome {
                    Ok(()) => driver.step(),
                    Err(error) => driver.result.settle(Err(error)),
                });
            }
            Ok(None) => self.result.settle(Ok(())),
            Err(error) => self.result.settle(Err(error)),
        }
    }
}

impl Scheduler {
    /// Awaits the handles of a lazy sequence one after another.
    ///
    /// Each element is requested only after the previous one completed.
    /// The returned handle succeeds when the sequence is exhausted and
    /// fails with the first member failure.
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
    /// let ticks = (0..3).map(move |i| {
    ///     println!("tick {i}");
    ///     timers.delay(Duration::from_millis(2))
    /// });
    ///
    /// scheduler.iterate(ticks).block_until_complete().unwrap();
    /// ```
    pub fn iterate<I>(&self, sequence: I) -> Handle
    where
        I: IntoIterator<Item = Handle>,
        I::IntoIter: Send + 'static,
    {
        self.try_iterate(sequence.into_iter().map(Ok::<Handle, BoxError>))
    }

    /// Like [`iterate`](Self::iterate), for sequences whose elements can
    /// fail to be produced.
    ///
    /// An `Err` element, or a panic while producing one, fails the
    /// returned handle and stops the iteration.
    pub fn try_iterate<I>(&self, sequence: I) -> Handle
    where
        I: IntoIterator<Item = Result<Handle, BoxError>>,
        I::IntoIter: Send + 'static,
    {
        let driver = Arc::new(Driver {
            sequence: Mutex::new(sequence.into_iter()),
            result: self.handle(),
        });

        let result = driver.result.clone();
        driver.step();

        result
    }
}
