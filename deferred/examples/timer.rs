//! Example: awaiting delays on the entry scheduler

use deferred::Scheduler;
use std::time::Duration;

#[deferred::main(worker_threads = 1)]
async fn main() {
    let scheduler = Scheduler::current().expect("main runs on its scheduler");

    println!("Waiting for 1 second...");
    scheduler.delay(Duration::from_secs(1)).await.unwrap();
    println!("Done!");
}
