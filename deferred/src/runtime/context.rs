//! Ambient context propagation.
//!
//! A continuation usually runs on a different thread than the one that
//! registered it. Call-scoped values (a request id, a tenant, a logical
//! counter) would be lost on that hop unless they travel with the work item.
//!
//! The scheduler talks to a [`ContextProvider`] through exactly two
//! operations: [`capture`](ContextProvider::capture) when a callback is
//! registered, and [`run_with`](ContextProvider::run_with) when a worker
//! executes it. The captured [`Snapshot`] is immutable; it is installed for
//! the duration of one callback and dropped afterwards.
//!
//! [`ThreadContext`] is the default provider. Its values are set with
//! [`set`] or [`scope`] and read with [`get`].

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A unit of work handed to the scheduler.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// An immutable capture of call-scoped values.
///
/// Cloning a snapshot is cheap. Adding a value produces a new snapshot and
/// leaves every earlier capture untouched.
#[derive(Clone, Default)]
pub struct Snapshot {
    values: Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Snapshot {
    /// Creates a snapshot holding no values.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if the snapshot holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of values in the snapshot.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns the value of type `T`, if present.
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.values
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Returns a new snapshot with `value` added, replacing any previous
    /// value of the same type.
    pub fn with<T>(&self, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        let mut values = (*self.values).clone();
        values.insert(TypeId::of::<T>(), Arc::new(value));

        Self {
            values: Arc::new(values),
        }
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("values", &self.values.len())
            .finish()
    }
}

/// The capture/restore collaborator used by handles and the scheduler.
pub trait ContextProvider: Send + Sync + 'static {
    /// Captures the caller's current ambient context.
    ///
    /// Returns `None` when there is nothing worth propagating; the work item
    /// then runs under an empty snapshot.
    fn capture(&self) -> Option<Snapshot>;

    /// Runs `callback` with `snapshot` installed as the ambient context.
    ///
    /// The previous context must be active again once `callback` returns or
    /// unwinds, including any value the callback set itself.
    fn run_with(&self, snapshot: Snapshot, callback: Callback);
}

/// Thread-scoped ambient context.
///
/// Values live in a per-thread slot. A worker running a callback sees the
/// snapshot that was current on the registering thread, and only for the
/// duration of that callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadContext;

impl ContextProvider for ThreadContext {
    fn capture(&self) -> Option<Snapshot> {
        current().filter(|snapshot| !snapshot.is_empty())
    }

    fn run_with(&self, snapshot: Snapshot, callback: Callback) {
        let installed = Some(snapshot).filter(|snapshot| !snapshot.is_empty());
        enter(installed, callback);
    }
}

/// A provider that never captures anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

impl ContextProvider for NoContext {
    fn capture(&self) -> Option<Snapshot> {
        None
    }

    fn run_with(&self, _snapshot: Snapshot, callback: Callback) {
        callback();
    }
}

thread_local! {
    /// Ambient context installed on the current thread.
    static CURRENT: RefCell<Option<Snapshot>> = const { RefCell::new(None) };
}

/// Returns the snapshot currently installed on this thread.
pub fn current() -> Option<Snapshot> {
    CURRENT.with(|cell| cell.borrow().clone())
}

/// Returns the ambient value of type `T` on this thread.
///
/// # Examples
///
/// ```rust
/// use deferred::context;
///
/// context::set(7u32);
/// assert_eq!(context::get::<u32>().as_deref(), Some(&7));
/// ```
pub fn get<T>() -> Option<Arc<T>>
where
    T: Any + Send + Sync,
{
    CURRENT.with(|cell| cell.borrow().as_ref().and_then(Snapshot::get::<T>))
}

/// Sets the ambient value of type `T` on this thread.
///
/// Snapshots captured before this call keep their old value.
pub fn set<T>(value: T)
where
    T: Any + Send + Sync,
{
    CURRENT.with(|cell| {
        let mut slot = cell.borrow_mut();
        let next = slot.take().unwrap_or_default().with(value);
        *slot = Some(next);
    });
}

/// Runs `f` with `value` added to the ambient context, then restores the
/// previous context.
pub fn scope<T, R>(value: T, f: impl FnOnce() -> R) -> R
where
    T: Any + Send + Sync,
{
    let next = current().unwrap_or_default().with(value);
    enter(Some(next), f)
}

/// Installs `snapshot` for the duration of `f`.
///
/// The previous context is restored by a drop guard, so a panicking `f`
/// does not leak its context into whatever the thread runs next.
fn enter<R>(snapshot: Option<Snapshot>, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT.with(|cell| cell.replace(snapshot));
    let _restore = Restore(previous);

    f()
}

struct Restore(Option<Snapshot>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        let _ = CURRENT.try_with(|cell| cell.replace(previous));
    }
}
