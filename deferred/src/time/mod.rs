//! Time-based handles.
//!
//! [`Scheduler::delay`](crate::Scheduler::delay) and
//! [`Scheduler::delay_millis`](crate::Scheduler::delay_millis) hand out
//! handles completed by a dedicated timer thread, independent of the worker
//! pool.

mod delay;

pub(crate) mod timer;
