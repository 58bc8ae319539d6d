use deferred::context::{self, ContextProvider, NoContext, Snapshot, ThreadContext};
use deferred::{ManualExecutor, Scheduler};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
struct RequestId(u32);

#[test]
fn test_snapshot_is_immutable() {
    let base = Snapshot::empty().with(RequestId(1));
    let next = base.with(RequestId(2));

    assert_eq!(base.get::<RequestId>().as_deref(), Some(&RequestId(1)));
    assert_eq!(next.get::<RequestId>().as_deref(), Some(&RequestId(2)));
    assert_eq!(next.len(), 1);
    assert!(Snapshot::empty().get::<RequestId>().is_none());
}

#[test]
fn test_scope_restores_previous_context() {
    context::set(RequestId(1));

    let inside = context::scope(RequestId(2), || context::get::<RequestId>());
    assert_eq!(inside.as_deref(), Some(&RequestId(2)));

    assert_eq!(context::get::<RequestId>().as_deref(), Some(&RequestId(1)));
}

#[test]
fn test_run_sees_value_captured_at_submission() {
    let scheduler = Scheduler::builder().worker_threads(4).build();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..100)
        .map(|i| {
            context::set(RequestId(i));
            let seen = seen.clone();
            scheduler.run(move || {
                let id = context::get::<RequestId>().map(|id| id.0);
                seen.lock().unwrap().push((i, id));
                Ok(())
            })
        })
        .collect();

    scheduler.when_all(handles).block_until_complete().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 100);
    for (expected, observed) in seen.iter() {
        assert_eq!(Some(*expected), *observed);
    }
}

#[test]
fn test_continuation_sees_context_of_attach_time() {
    let (executor, scheduler) = {
        let executor = Arc::new(ManualExecutor::new());
        (executor.clone(), Scheduler::with_executor(executor))
    };
    let handle = scheduler.handle();
    let seen = Arc::new(Mutex::new(None));

    let s = seen.clone();
    context::scope(RequestId(42), || {
        handle.attach_continuation(move || {
            *s.lock().unwrap() = context::get::<RequestId>().map(|id| id.0);
        });
    });

    context::scope(RequestId(7), || handle.complete_success().unwrap());

    executor.run_until_idle();
    assert_eq!(*seen.lock().unwrap(), Some(42));
}

#[test]
fn test_context_is_discarded_after_callback() {
    let executor = Arc::new(ManualExecutor::new());
    let scheduler = Scheduler::with_executor(executor.clone());

    context::scope(RequestId(5), || scheduler.submit(|| {}));

    // The manual executor runs on this thread; after the item the thread's
    // own (empty) context must be back.
    executor.run_until_idle();
    assert!(context::get::<RequestId>().is_none());
}

fn explode() {
    panic!("inside context");
}

#[test]
fn test_context_restored_even_if_callback_panics() {
    let provider = ThreadContext;
    let snapshot = Snapshot::empty().with(RequestId(9));

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        provider.run_with(snapshot, Box::new(explode));
    }));

    assert!(result.is_err());
    assert!(context::get::<RequestId>().is_none());
}

#[test]
fn test_no_context_provider_captures_nothing() {
    let scheduler = Scheduler::builder()
        .worker_threads(1)
        .context(NoContext)
        .build();
    let seen = Arc::new(Mutex::new(Some(0)));

    context::set(RequestId(3));

    let s = seen.clone();
    scheduler
        .run(move || {
            *s.lock().unwrap() = context::get::<RequestId>().map(|id| id.0);
            Ok(())
        })
        .block_until_complete()
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), None);
    assert!(NoContext.capture().is_none());
}

#[test]
fn test_empty_context_is_not_captured() {
    assert!(ThreadContext.capture().is_none());

    context::scope(RequestId(1), || {
        assert_eq!(ThreadContext.capture().map(|s| s.len()), Some(1));
    });
}

#[test]
fn test_value_set_inside_item_does_not_reach_next_item() {
    let scheduler = Scheduler::builder().worker_threads(1).build();

    // Submitted from a thread with no context: both items carry no snapshot
    // and share the single worker.
    let first = std::thread::spawn({
        let scheduler = scheduler.clone();
        move || {
            scheduler.run(|| {
                context::set(RequestId(99));
                Ok(())
            })
        }
    })
    .join()
    .unwrap();
    first.block_until_complete().unwrap();

    let seen = Arc::new(Mutex::new(Some(0)));
    let s = seen.clone();

    std::thread::spawn({
        let scheduler = scheduler.clone();
        move || {
            scheduler.run(move || {
                *s.lock().unwrap() = context::get::<RequestId>().map(|id| id.0);
                Ok(())
            })
        }
    })
    .join()
    .unwrap()
    .block_until_complete()
    .unwrap();

    assert_eq!(*seen.lock().unwrap(), None);
}

#[test]
fn test_value_set_inside_item_does_not_leak_into_runner_thread() {
    let executor = Arc::new(ManualExecutor::new());
    let scheduler = Scheduler::with_executor(executor.clone());

    scheduler.submit(|| context::set(RequestId(11)));
    scheduler.submit(|| assert!(context::get::<RequestId>().is_none()));

    assert_eq!(executor.run_until_idle(), 2);
    assert!(context::get::<RequestId>().is_none());
}
