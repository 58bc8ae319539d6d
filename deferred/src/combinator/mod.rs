//! Fan-in and sequencing over many handles.
//!
//! - [`Scheduler::when_all`](crate::Scheduler::when_all): completes once
//!   every member has completed.
//! - [`Scheduler::iterate`](crate::Scheduler::iterate): awaits the members
//!   of a lazy sequence one by one.

mod iterate;
mod when_all;
