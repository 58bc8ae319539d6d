//! Scheduling components.
//!
//! This module contains everything that decides where and how callbacks
//! run:
//! - the [`Scheduler`] capability and its builder,
//! - the executors behind it (worker pool and manual queue),
//! - ambient context capture and restoration,
//! - the task machinery that polls spawned futures.
//!
//! Most users only touch [`Scheduler`] and the handles it produces.

pub(crate) mod builder;
pub(crate) mod scheduler;
pub(crate) mod task;

pub mod context;
pub mod executor;
