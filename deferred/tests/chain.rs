use deferred::{Error, ManualExecutor, Scheduler};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, PartialEq)]
struct StepFailed(u32);

impl fmt::Display for StepFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} failed", self.0)
    }
}

impl std::error::Error for StepFailed {}

fn manual() -> (Arc<ManualExecutor>, Scheduler) {
    let executor = Arc::new(ManualExecutor::new());
    let scheduler = Scheduler::with_executor(executor.clone());
    (executor, scheduler)
}

#[test]
fn test_chain_runs_after_antecedent() {
    let (executor, scheduler) = manual();
    let first = scheduler.handle();
    let ran = Arc::new(AtomicBool::new(false));

    let r = ran.clone();
    let next = first.chain(move || {
        r.store(true, Ordering::SeqCst);
        Ok(())
    });

    executor.run_until_idle();
    assert!(!ran.load(Ordering::SeqCst));
    assert!(!next.is_completed());

    first.complete_success().unwrap();
    executor.run_until_idle();

    assert!(ran.load(Ordering::SeqCst));
    assert!(matches!(next.outcome(), Some(Ok(()))));
}

#[test]
fn test_chain_error_is_returned_verbatim() {
    let scheduler = Scheduler::builder().worker_threads(2).build();

    let next = scheduler
        .run(|| Ok(()))
        .chain(|| Err(Box::new(StepFailed(7)) as _));

    let err = next.block_until_complete().unwrap_err();
    assert_eq!(err.downcast_ref::<StepFailed>(), Some(&StepFailed(7)));
}

#[test]
fn test_chain_error_seen_by_every_waiter_is_the_same_value() {
    let scheduler = Scheduler::builder().worker_threads(2).build();

    let source = scheduler.handle();
    let failing = source.chain(|| Err("nope".into()));
    source.complete_success().unwrap();

    let a = failing.block_until_complete().unwrap_err();
    let b = failing.block_until_complete().unwrap_err();

    assert!(Arc::ptr_eq(a.as_failure().unwrap(), b.as_failure().unwrap()));
    assert_eq!(a.to_string(), "nope");
}

#[test]
fn test_chain_panic_becomes_failure() {
    let scheduler = Scheduler::builder().worker_threads(1).build();

    let next = scheduler.run(|| Ok(())).chain(|| panic!("exploded in chain"));

    match next.block_until_complete() {
        Err(Error::Panicked(msg)) => assert!(msg.contains("exploded in chain")),
        other => panic!("expected a captured panic, got {other:?}"),
    }

    // The single worker survived the panic.
    assert!(scheduler.run(|| Ok(())).block_until_complete().is_ok());
}

#[test]
fn test_chain_skips_action_after_failed_antecedent() {
    let (executor, scheduler) = manual();
    let first = scheduler.handle();
    let ran = Arc::new(AtomicBool::new(false));

    let r = ran.clone();
    let next = first.chain(move || {
        r.store(true, Ordering::SeqCst);
        Ok(())
    });

    first
        .complete_failure(Error::failed(StepFailed(1)))
        .unwrap();
    executor.run_until_idle();

    assert!(!ran.load(Ordering::SeqCst));
    let err = next.outcome().unwrap().unwrap_err();
    assert_eq!(err.downcast_ref::<StepFailed>(), Some(&StepFailed(1)));
}

#[test]
fn test_chain_sequence_preserves_order() {
    let scheduler = Scheduler::builder().worker_threads(4).build();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut handle = scheduler.delay(Duration::from_millis(5));
    for i in 0..10 {
        let log = log.clone();
        handle = handle.chain(move || {
            log.lock().unwrap().push(i);
            Ok(())
        });
    }

    handle.block_until_complete().unwrap();
    assert_eq!(*log.lock().unwrap(), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_chain_async_waits_for_inner_handle() {
    let (executor, scheduler) = manual();
    let first = scheduler.handle();
    let inner = scheduler.handle();

    let returned = inner.clone();
    let next = first.chain_async(move || Ok(returned));

    first.complete_success().unwrap();
    executor.run_until_idle();

    assert!(!next.is_completed(), "must stay pending until the inner handle completes");

    inner.complete_success().unwrap();
    executor.run_until_idle();

    assert!(matches!(next.outcome(), Some(Ok(()))));
}

#[test]
fn test_chain_async_forwards_inner_failure_only_after_it_happens() {
    let (executor, scheduler) = manual();
    let first = scheduler.handle();
    let inner = scheduler.handle();

    let returned = inner.clone();
    let next = first.chain_async(move || Ok(returned));

    first.complete_success().unwrap();
    executor.run_until_idle();
    assert!(next.outcome().is_none());

    inner
        .complete_failure(Error::failed(StepFailed(2)))
        .unwrap();
    assert!(next.outcome().is_none(), "forwarding goes through the scheduler");

    executor.run_until_idle();

    let err = next.outcome().unwrap().unwrap_err();
    assert_eq!(err.downcast_ref::<StepFailed>(), Some(&StepFailed(2)));

    let inner_failure = inner.outcome().unwrap().unwrap_err();
    assert!(Arc::ptr_eq(
        err.as_failure().unwrap(),
        inner_failure.as_failure().unwrap()
    ));
}

#[test]
fn test_chain_async_action_error() {
    let scheduler = Scheduler::builder().worker_threads(2).build();

    let next = scheduler
        .run(|| Ok(()))
        .chain_async(|| Err(Box::new(StepFailed(3)) as _));

    let err = next.block_until_complete().unwrap_err();
    assert_eq!(err.downcast_ref::<StepFailed>(), Some(&StepFailed(3)));
}

#[test]
fn test_chain_async_with_delays() {
    let scheduler = Scheduler::builder().worker_threads(2).build();
    let steps = Arc::new(AtomicUsize::new(0));

    let s1 = scheduler.clone();
    let s2 = scheduler.clone();
    let c1 = steps.clone();
    let c2 = steps.clone();
    let c3 = steps.clone();

    let start = std::time::Instant::now();

    scheduler
        .delay(Duration::from_millis(20))
        .chain_async(move || {
            c1.fetch_add(1, Ordering::SeqCst);
            Ok(s1.delay(Duration::from_millis(20)))
        })
        .chain_async(move || {
            c2.fetch_add(1, Ordering::SeqCst);
            Ok(s2.delay(Duration::from_millis(20)))
        })
        .chain(move || {
            c3.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .block_until_complete()
        .unwrap();

    assert_eq!(steps.load(Ordering::SeqCst), 3);
    assert!(start.elapsed() >= Duration::from_millis(60));
}
