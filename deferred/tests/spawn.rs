use deferred::{Error, Scheduler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn entry() -> Scheduler {
    Scheduler::current().expect("body runs on the scheduler built by the attribute")
}

#[deferred::test]
async fn test_await_delay_in_async_fn() {
    let start = Instant::now();

    entry().delay(Duration::from_millis(30)).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[deferred::test(worker_threads = 1)]
async fn test_await_loop_of_delays() {
    let scheduler = entry();
    let mut ticks = 0;

    for _ in 0..5 {
        scheduler.delay(Duration::from_millis(2)).await.unwrap();
        ticks += 1;
    }

    assert_eq!(ticks, 5);
}

#[deferred::test(worker_threads = 1)]
async fn test_body_runs_on_configured_scheduler() {
    let scheduler = entry();
    assert!(!scheduler.ptr_eq(Scheduler::global()));

    let body_thread = thread::current().id();
    let job_thread = Arc::new(Mutex::new(None));

    let slot = job_thread.clone();
    scheduler
        .run(move || {
            *slot.lock().unwrap() = Some(thread::current().id());
            Ok(())
        })
        .await
        .unwrap();

    // A single worker polls the body and runs the job.
    assert_eq!(*job_thread.lock().unwrap(), Some(body_thread));
}

#[deferred::test]
async fn test_await_failed_handle_yields_error() {
    let failed = entry().run(|| Err("async failure".into()));

    let err = failed.await.unwrap_err();
    assert_eq!(err.to_string(), "async failure");
}

#[deferred::test]
async fn test_await_by_reference() {
    let handle = entry().delay(Duration::from_millis(5));

    (&handle).await.unwrap();
    assert!(handle.is_completed());
}

#[test]
fn test_current_is_none_outside_scheduler() {
    assert!(Scheduler::current().is_none());
}

#[test]
fn test_current_inside_continuation_is_handle_scheduler() {
    let scheduler = Scheduler::builder().worker_threads(2).build();
    let seen = Arc::new(Mutex::new(None));

    let slot = seen.clone();
    scheduler
        .delay(Duration::from_millis(5))
        .chain(move || {
            *slot.lock().unwrap() = Scheduler::current();
            Ok(())
        })
        .block_until_complete()
        .unwrap();

    let seen = seen.lock().unwrap().take().unwrap();
    assert!(seen.ptr_eq(&scheduler));
    assert!(Scheduler::current().is_none());
}

#[test]
fn test_block_on_returns_value() {
    let scheduler = Scheduler::builder().worker_threads(2).build();

    let value = scheduler.block_on(async { 6 * 7 }).unwrap();
    assert_eq!(value, 42);
}

#[test]
fn test_spawn_error_becomes_failure() {
    let scheduler = Scheduler::builder().worker_threads(2).build();
    let timers = scheduler.clone();

    let handle = scheduler.spawn(async move {
        timers.delay(Duration::from_millis(5)).await?;
        Err::<(), Error>(Error::IllegalArgument("from task".into()))
    });

    match handle.block_until_complete() {
        Err(Error::IllegalArgument(msg)) => assert_eq!(msg, "from task"),
        other => panic!("expected the task's own error, got {other:?}"),
    }
}

#[test]
fn test_spawn_panic_becomes_failure() {
    let scheduler = Scheduler::builder().worker_threads(1).build();

    let explode = true;
    let handle = scheduler.spawn(async move {
        if explode {
            panic!("task blew up");
        }
    });

    assert!(matches!(handle.block_until_complete(), Err(Error::Panicked(_))));
    assert_eq!(scheduler.block_on(async { 1 }).unwrap(), 1);
}

#[test]
fn test_spawned_task_resumes_when_awaited_handle_completes() {
    let scheduler = Scheduler::builder().worker_threads(2).build();
    let gate = scheduler.handle();
    let resumed = Arc::new(AtomicUsize::new(0));

    let awaited = gate.clone();
    let r = resumed.clone();
    let task = scheduler.spawn(async move {
        awaited.await?;
        r.fetch_add(1, Ordering::SeqCst);
        Ok::<(), Error>(())
    });

    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(resumed.load(Ordering::SeqCst), 0);

    gate.complete_success().unwrap();
    task.block_until_complete().unwrap();
    assert_eq!(resumed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_many_spawned_tasks_with_when_all() {
    let scheduler = Scheduler::builder().worker_threads(4).build();
    let counter = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..200)
        .map(|i| {
            let counter = counter.clone();
            let timers = scheduler.clone();
            scheduler.spawn(async move {
                timers.delay(Duration::from_millis(i % 5)).await?;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), Error>(())
            })
        })
        .collect();

    scheduler.when_all(tasks).block_until_complete().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 200);
}
