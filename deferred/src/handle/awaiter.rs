use super::Handle;
use crate::error::Error;

use parking_lot::Mutex;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Future resolving once a [`Handle`] completes.
///
/// Created by `.await`ing a handle (through [`IntoFuture`]) or by
/// [`Handle::awaiter`].
pub struct Awaiter {
    handle: Handle,

    /// Waker of the task currently awaiting; refreshed on every poll.
    waker: Arc<Mutex<Option<Waker>>>,

    /// Whether the wake-up continuation has been attached.
    registered: bool,
}

impl Handle {
    /// Returns a future resolving to this handle's outcome.
    pub fn awaiter(&self) -> Awaiter {
        Awaiter {
            handle: self.clone(),
            waker: Arc::new(Mutex::new(None)),
            registered: false,
        }
    }
}

impl Future for Awaiter {
    type Output = Result<(), Error>;

    /// Polls the handle.
    ///
    /// The waker is stored **before** the outcome is checked a second time,
    /// so a completion racing with this poll is never missed.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(result) = this.handle.outcome() {
            return Poll::Ready(result);
        }

        *this.waker.lock() = Some(cx.waker().clone());

        if !this.registered {
            this.registered = true;

            let slot = this.waker.clone();
            this.handle.on_complete(move |_| {
                if let Some(waker) = slot.lock().take() {
                    waker.wake();
                }
            });
        }

        match this.handle.outcome() {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        }
    }
}

impl IntoFuture for Handle {
    type Output = Result<(), Error>;
    type IntoFuture = Awaiter;

    fn into_future(self) -> Awaiter {
        self.awaiter()
    }
}

impl IntoFuture for &Handle {
    type Output = Result<(), Error>;
    type IntoFuture = Awaiter;

    fn into_future(self) -> Awaiter {
        self.awaiter()
    }
}
