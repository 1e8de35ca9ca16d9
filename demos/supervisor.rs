//! Supervisor example - join a group of workers, then surface the first panic

use fault_collector::prelude::*;
use std::thread;
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    println!("=== Supervisor Example ===\n");

    let collector = FaultCollector::new();

    thread::scope(|s| {
        for i in 0..6u64 {
            let collector = &collector;
            thread::Builder::new()
                .name(format!("worker-{}", i))
                .spawn_scoped(s, move || {
                    collector.guard(|| {
                        thread::sleep(Duration::from_millis(10 * i));
                        if i % 2 == 1 {
                            panic!("worker {} hit a bad record", i);
                        }
                        println!("worker {} finished", i);
                    });
                })
                .expect("failed to spawn worker");
        }
    });

    println!("\nall workers joined");

    match collector.first_fault() {
        Some(record) => {
            println!("first fault: {:?}", record.message());
            if let Some(location) = record.location() {
                println!("  raised at {} on thread {}", location, record.thread());
            }
            println!("  {} caller frames captured", record.callers().len());
        }
        None => println!("no worker panicked"),
    }

    #[cfg(feature = "telemetry")]
    {
        let snapshot = collector.metrics();
        println!(
            "guards: {}, faults caught: {}, discarded: {}",
            snapshot.guards_run, snapshot.faults_caught, snapshot.faults_discarded
        );
    }

    if let Err(err) = collector.check() {
        println!("\nsupervisor error:\n{}", err);
    }

    // fail loudly in the supervisor's own context
    collector.reraise();
}
