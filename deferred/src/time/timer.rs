use crate::handle::Handle;

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::thread;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Requests sent to the timer thread.
pub(crate) enum Command {
    /// Complete `handle` successfully once `deadline` is reached.
    Schedule { deadline: Instant, handle: Handle },
}

/// An entry in the timer queue.
///
/// Entries live in a [`BinaryHeap`] ordered so that the earliest deadline
/// is popped first.
struct TimerEntry {
    /// The time at which the timer should fire.
    deadline: Instant,

    /// Insertion order; keeps equal deadlines first-in, first-out.
    sequence: u64,

    /// Handle completed when the timer fires.
    handle: Handle,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.sequence == other.sequence
    }
}

impl Ord for TimerEntry {
    /// Orders entries by deadline, then by insertion order.
    ///
    /// The comparison is **reversed** so that a `BinaryHeap<TimerEntry>`
    /// behaves as a min-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sending side of the timer thread.
pub(crate) struct TimerHandle {
    sender: Sender<Command>,
}

impl TimerHandle {
    /// Registers `handle` to be completed at `deadline`.
    pub(crate) fn schedule(&self, deadline: Instant, handle: Handle) {
        trace!(?deadline, "registering timer");

        if let Err(err) = self.sender.send(Command::Schedule { deadline, handle }) {
            // The timer thread is gone; fire right away rather than never.
            let Command::Schedule { handle, .. } = err.into_inner();
            warn!("timer thread unavailable, completing delay immediately");
            handle.settle(Ok(()));
        }
    }
}

/// The timer thread.
///
/// A dedicated OS thread owning a deadline heap. It sleeps on its command
/// channel until the next deadline, so pending delays never occupy a
/// scheduler worker.
pub(crate) struct Timer {
    receiver: Receiver<Command>,
    timers: BinaryHeap<TimerEntry>,
    sequence: u64,
}

impl Timer {
    /// Spawns the timer thread and returns its handle.
    ///
    /// The thread exits once every [`TimerHandle`] is dropped, which can
    /// only happen after the last pending timer fired.
    pub(crate) fn start() -> TimerHandle {
        let (sender, receiver) = unbounded();

        let mut timer = Timer {
            receiver,
            timers: BinaryHeap::new(),
            sequence: 0,
        };

        thread::Builder::new()
            .name(String::from("deferred-timer"))
            .spawn(move || timer.run())
            .expect("failed to spawn timer thread");

        TimerHandle { sender }
    }

    fn run(&mut self) {
        debug!("timer thread started");

        loop {
            self.fire_expired();

            let command = match self.timers.peek() {
                // A pending entry holds a handle, the handle its scheduler and
                // the scheduler the sender: the channel cannot disconnect
                // while the heap is non-empty, so an error here is a timeout.
                Some(next) => self.receiver.recv_deadline(next.deadline).ok(),
                None => match self.receiver.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                },
            };

            if let Some(Command::Schedule { deadline, handle }) = command {
                self.sequence += 1;
                self.timers.push(TimerEntry {
                    deadline,
                    sequence: self.sequence,
                    handle,
                });
            }
        }

        debug!("timer thread stopped");
    }

    fn fire_expired(&mut self) {
        let now = Instant::now();

        while let Some(entry) = self.timers.peek() {
            if entry.deadline > now {
                break;
            }

            if let Some(entry) = self.timers.pop() {
                entry.handle.settle(Ok(()));
            }
        }
    }
}
