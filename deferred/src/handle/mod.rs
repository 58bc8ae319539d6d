//! Deferred handles.
//!
//! A [`Handle`] is a single-assignment completion cell: pending until
//! someone completes it with success or failure, then frozen. Continuations
//! attached to it are handed to its scheduler in attachment order once the
//! terminal state is reached.
//!
//! This module also contains sequential composition ([`Handle::chain`],
//! [`Handle::chain_async`]) and the [`Awaiter`] future that lets async code
//! `.await` a handle.

mod awaiter;
mod chain;
mod deferred;
mod state;

pub use awaiter::Awaiter;
pub use deferred::Handle;
