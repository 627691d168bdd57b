//! Contention tests for the bounded deque.
//!
//! Runs the stress harness at full scale: 4 producers pushing 100,000 items
//! each through a queue of 64, drained by 4 consumers.

use litepipe::queue::BoundedDeque;
use litepipe::stress::{StressConfig, run_stress};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

#[test]
fn test_full_scale_integers() {
    let report = run_stress::<u64>(&StressConfig::default()).unwrap();

    assert_eq!(report.push_attempts, 400_000);
    assert!(report.push_successes >= report.pop_successes);
    assert_eq!(
        report.final_size as u64,
        report.push_successes - report.pop_successes
    );
    assert_eq!(report.final_size, 0);
    assert_eq!(report.queue.capacity, 64);
}

#[test]
fn test_full_scale_strings() {
    let report = run_stress::<String>(&StressConfig::default()).unwrap();

    assert_eq!(report.push_successes, 400_000);
    assert_eq!(report.pop_successes, 400_000);
    assert_eq!(report.final_size, 0);
}

#[test]
fn test_many_consumers_few_producers() {
    let config = StressConfig::default()
        .with_producers(1)
        .with_consumers(8)
        .with_capacity(4)
        .with_items_per_producer(50_000);

    let report = run_stress::<u32>(&config).unwrap();
    assert_eq!(report.pop_successes, 50_000);

    let consumed: u64 = report
        .stages
        .iter()
        .filter(|stage| stage.name.starts_with("consumer-"))
        .map(|stage| stage.items_out)
        .sum();
    assert_eq!(consumed, 50_000);
}

/// Same scenario without the harness: close while producers are still
/// pushing, and check that nothing accepted is lost.
#[test]
fn test_close_during_production() {
    let queue = BoundedDeque::new(64).unwrap();
    let pushed = Arc::new(AtomicU64::new(0));
    let popped = Arc::new(AtomicU64::new(0));

    let producers: Vec<_> = (0..4u64)
        .map(|id| {
            let queue = queue.clone();
            let pushed = Arc::clone(&pushed);
            thread::spawn(move || {
                for i in 0..1_000_000u64 {
                    if !queue.push(id * 1_000_000 + i) {
                        break;
                    }
                    pushed.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let queue = queue.clone();
            let popped = Arc::clone(&popped);
            thread::spawn(move || {
                while queue.front_pop().is_some() {
                    popped.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    queue.close();

    for t in producers.into_iter().chain(consumers) {
        t.join().unwrap();
    }

    assert_eq!(queue.size(), 0);
    assert_eq!(pushed.load(Ordering::SeqCst), popped.load(Ordering::SeqCst));
    let stats = queue.stats();
    assert_eq!(stats.total_pushed, stats.total_popped);
    assert!(stats.total_rejected <= 4);
}
