use crate::error::Error;
use crate::runtime::context::Snapshot;

/// Terminal state of a handle.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Success,
    Failure(Error),
}

impl Outcome {
    pub(crate) fn from_result(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(error) => Self::Failure(error),
        }
    }

    pub(crate) fn to_result(&self) -> Result<(), Error> {
        match self {
            Self::Success => Ok(()),
            Self::Failure(error) => Err(error.clone()),
        }
    }
}

/// Callback run once a handle reaches its terminal state.
///
/// It receives the outcome so internal combinators never need to hold a
/// reference back to the handle they observe.
pub(crate) type OnComplete = Box<dyn FnOnce(Result<(), Error>) + Send + 'static>;

/// A registered continuation and the context captured when it was attached.
pub(crate) struct Continuation {
    pub(crate) callback: OnComplete,
    pub(crate) snapshot: Option<Snapshot>,
}

/// Lock-protected part of a handle.
#[derive(Default)]
pub(crate) struct State {
    /// `None` while pending. Written at most once.
    pub(crate) outcome: Option<Outcome>,

    /// Continuations in attachment order. Drained on completion.
    pub(crate) continuations: Vec<Continuation>,
}
