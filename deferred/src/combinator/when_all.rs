use crate::error::Error;
use crate::handle::Handle;
use crate::runtime::scheduler::Scheduler;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared state of one `when_all` call.
struct Group {
    /// Members whose continuation has not fired yet.
    remaining: AtomicUsize,

    /// Failure of each member, indexed by input position. Each slot is
    /// written at most once, by that member's continuation.
    failures: Vec<OnceLock<Error>>,

    result: Handle,
}

impl Group {
    fn arrive(&self, index: usize, outcome: Result<(), Error>) {
        if let Err(error) = outcome {
            let _ = self.failures[index].set(error);
        }

        // AcqRel makes every earlier member's slot write visible to the
        // member that brings the count to zero.
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.finish();
        }
    }

    fn finish(&self) {
        let mut failures: Vec<Error> = self
            .failures
            .iter()
            .filter_map(|slot| slot.get().cloned())
            .collect();

        let outcome = match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(Error::Aggregate(failures)),
        };

        self.result.settle(outcome);
    }
}

impl Scheduler {
    /// Returns a handle that completes once every handle in `handles` has
    /// completed.
    ///
    /// - An empty input yields an already-completed handle.
    /// - The result always waits for every member, even after a failure.
    /// - If one member failed, the result fails with that member's error;
    ///   if several failed, with [`Error::Aggregate`] holding their errors
    ///   in input order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferred::Scheduler;
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// let scheduler = Scheduler::builder().worker_threads(4).build();
    /// let counter = Arc::new(AtomicUsize::new(0));
    ///
    /// let handles: Vec<_> = (0..16)
    ///     .map(|_| {
    ///         let counter = counter.clone();
    ///         scheduler.run(move || {
    ///             counter.fetch_add(1, Ordering::SeqCst);
    ///             Ok(())
    ///         })
    ///     })
    ///     .collect();
    ///
    /// scheduler.when_all(handles).block_until_complete().unwrap();
    /// assert_eq!(counter.load(Ordering::SeqCst), 16);
    /// ```
    pub fn when_all<I>(&self, handles: I) -> Handle
    where
        I: IntoIterator<Item = Handle>,
    {
        let members: Vec<Handle> = handles.into_iter().collect();

        if members.is_empty() {
            return Handle::completed(self);
        }

        let group = Arc::new(Group {
            remaining: AtomicUsize::new(members.len()),
            failures: members.iter().map(|_| OnceLock::new()).collect(),
            result: self.handle(),
        });

        for (index, member) in members.iter().enumerate() {
            let group = group.clone();
            member.on_complete(move |outcome| group.arrive(index, outcome));
        }

        group.result.clone()
    }
}
