//! Example: chaining work on the scheduler built by `#[deferred::main]`

use deferred::Scheduler;

#[deferred::main(worker_threads = 4)]
async fn main() {
    let scheduler = Scheduler::current().expect("main runs on its scheduler");

    let handles: Vec<_> = (0..4)
        .map(|i| {
            scheduler.run(move || {
                println!("job {i} on {:?}", std::thread::current().name());
                Ok(())
            })
        })
        .collect();

    scheduler
        .when_all(handles)
        .chain(|| {
            println!("all jobs done");
            Ok(())
        })
        .await
        .unwrap();
}
