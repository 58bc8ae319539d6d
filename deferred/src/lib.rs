//! # Deferred
//!
//! **Deferred** is a small completion primitive built by hand: a
//! single-assignment [`Handle`] with attachable continuations, a fixed-size
//! worker pool that runs those continuations, and a handful of operators
//! composed on top of them.
//!
//! It provides:
//!
//! - **Handles** that complete at most once, with success or failure, and
//!   run every attached continuation exactly once on the [`Scheduler`]
//! - **Sequential composition** with [`Handle::chain`] and
//!   [`Handle::chain_async`], without ever blocking a thread
//! - **Timers** through [`Scheduler::delay`], served by a dedicated timer
//!   thread rather than a worker
//! - **Fan-in** with [`Scheduler::when_all`] and a **sequential driver**
//!   over lazy sequences with [`Scheduler::iterate`]
//! - **Ambient context** captured when a continuation is registered and
//!   restored around its execution, see [`context`]
//! - **Async interop**: handles can be `.await`ed, futures can be spawned
//!   with [`Scheduler::spawn`], and `#[deferred::main]` /
//!   `#[deferred::test]` wrap an `async fn` body whose scheduler is
//!   reachable through [`Scheduler::current`]
//!
//! ## Quick Start
//!
//! ```rust
//! use deferred::Scheduler;
//! use std::time::Duration;
//!
//! let scheduler = Scheduler::builder().worker_threads(2).build();
//! let inner = scheduler.clone();
//!
//! let done = scheduler
//!     .delay(Duration::from_millis(10))
//!     .chain(|| {
//!         println!("Hello,");
//!         Ok(())
//!     })
//!     .chain_async(move || Ok(inner.delay(Duration::from_millis(10))))
//!     .chain(|| {
//!         println!("World!");
//!         Ok(())
//!     });
//!
//! done.block_until_complete().unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`context`] — Ambient context capture and restoration
//! - [`executor`] — Worker pool and manual executor

mod combinator;
mod error;
mod handle;
mod runtime;
mod time;

pub use error::{BoxError, Error, Failure};
pub use handle::{Awaiter, Handle};
pub use runtime::builder::SchedulerBuilder;
pub use runtime::context;
pub use runtime::executor;
pub use runtime::executor::{Executor, ManualExecutor, ThreadPool, WorkItem};
pub use runtime::scheduler::Scheduler;
pub use runtime::task::IntoOutcome;

pub use deferred_macros::{main, test};
