use std::any::Any;
use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

/// Boxed error returned by user actions passed to [`Handle::chain`],
/// [`Scheduler::run`] and friends.
///
/// [`Handle::chain`]: crate::Handle::chain
/// [`Scheduler::run`]: crate::Scheduler::run
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Shared, type-erased error stored as a handle's terminal failure.
pub type Failure = Arc<dyn StdError + Send + Sync + 'static>;

/// Errors produced by handles, the scheduler and the combinators.
///
/// `Error` is cheap to clone: a stored failure is reference counted, so
/// every waiter of a failed handle observes the very same error value.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// A handle that already reached a terminal state was completed again.
    #[error("handle already completed")]
    IllegalState,

    /// An operation was given an argument outside its domain.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// An action failed with an error of its own.
    #[error(transparent)]
    Failed(Failure),

    /// An action panicked while running on the scheduler.
    #[error("action panicked: {0}")]
    Panicked(String),

    /// Several members of a `when_all` group failed.
    ///
    /// Failures are listed in the order the members were given.
    #[error("{} member handles failed", .0.len())]
    Aggregate(Vec<Error>),
}

impl Error {
    /// Wraps an arbitrary error as a handle failure.
    pub fn failed<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from_boxed(Box::new(error))
    }

    /// Converts a boxed error into an `Error`.
    ///
    /// A box that already holds an `Error` is unwrapped instead of wrapped a
    /// second time, so failures travel through chains unchanged.
    pub fn from_boxed(error: BoxError) -> Self {
        match error.downcast::<Error>() {
            Ok(error) => *error,
            Err(other) => Self::Failed(Arc::from(other)),
        }
    }

    /// Builds a [`Error::Panicked`] from a payload caught by
    /// [`std::panic::catch_unwind`].
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };

        Self::Panicked(message)
    }

    /// Returns the stored failure if this is [`Error::Failed`].
    pub fn as_failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Attempts to view the stored failure as a concrete error type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.as_failure().and_then(|failure| failure.downcast_ref::<E>())
    }
}

impl From<BoxError> for Error {
    fn from(error: BoxError) -> Self {
        Self::from_boxed(error)
    }
}

/// Runs a user action, turning a returned error or a panic into an
/// [`Error`].
pub(crate) fn guard<T, F>(action: F) -> Result<T, Error>
where
    F: FnOnce() -> Result<T, BoxError>,
{
    match panic::catch_unwind(AssertUnwindSafe(action)) {
        Ok(result) => result.map_err(Error::from_boxed),
        Err(payload) => Err(Error::from_panic(payload)),
    }
}
