//! Integration tests for the bounded deque.
//!
//! These tests verify that:
//! - Pushes block at capacity and resume when space frees up
//! - Closing wakes every blocked pusher and popper
//! - A closed queue still drains in order
//! - Items keep their producer's order across many threads

use litepipe::Error;
use litepipe::queue::BoundedDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Spin until `cond` holds or the deadline passes.
fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

#[test]
fn test_zero_capacity_is_rejected() {
    assert!(matches!(
        BoundedDeque::<u8>::new(0),
        Err(Error::InvalidCapacity)
    ));
}

#[test]
fn test_push_blocks_until_pop() {
    let queue = BoundedDeque::new(1).unwrap();
    assert!(queue.push(1u32));

    let pushed = Arc::new(AtomicUsize::new(0));
    let pusher = {
        let queue = queue.clone();
        let pushed = Arc::clone(&pushed);
        thread::spawn(move || {
            let ok = queue.push(2);
            pushed.store(1, Ordering::SeqCst);
            ok
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert_eq!(pushed.load(Ordering::SeqCst), 0, "push must block while full");
    assert_eq!(queue.size(), 1);

    assert_eq!(queue.front_pop(), Some(1));
    assert!(pusher.join().unwrap());
    assert_eq!(queue.front_pop(), Some(2));
}

#[test]
fn test_close_wakes_blocked_pushers() {
    let queue = BoundedDeque::new(2).unwrap();
    queue.push(0u32);
    queue.push(0u32);

    let pushers: Vec<_> = (0..4)
        .map(|i| {
            let queue = queue.clone();
            thread::spawn(move || queue.push(i))
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    assert!(queue.close());

    for pusher in pushers {
        assert!(!pusher.join().unwrap());
    }
    assert_eq!(queue.size(), 2);
    assert_eq!(queue.stats().total_rejected, 4);
}

#[test]
fn test_close_wakes_blocked_poppers() {
    let queue = BoundedDeque::<u32>::new(4).unwrap();

    let poppers: Vec<_> = (0..4)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || queue.front_pop())
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    queue.close();

    for popper in poppers {
        assert_eq!(popper.join().unwrap(), None);
    }
}

#[test]
fn test_no_deadlock_on_close_under_load() {
    // Many threads blocked on both sides; close must release all of them.
    let queue = BoundedDeque::new(1).unwrap();
    let finished = Arc::new(AtomicUsize::new(0));

    let mut threads = Vec::new();
    for i in 0..8u32 {
        let queue = queue.clone();
        let finished = Arc::clone(&finished);
        threads.push(thread::spawn(move || {
            while queue.push(i) {}
            finished.fetch_add(1, Ordering::SeqCst);
        }));
    }
    for _ in 0..2 {
        let queue = queue.clone();
        let finished = Arc::clone(&finished);
        threads.push(thread::spawn(move || {
            while queue.front_pop().is_some() {
                thread::sleep(Duration::from_micros(50));
            }
            finished.fetch_add(1, Ordering::SeqCst);
        }));
    }

    thread::sleep(Duration::from_millis(30));
    queue.close();

    assert!(
        wait_until(Duration::from_secs(5), || finished.load(Ordering::SeqCst) == 10),
        "threads still blocked after close"
    );
    for t in threads {
        t.join().unwrap();
    }
    assert_eq!(queue.size(), 0);
}

#[test]
fn test_closed_queue_drains_in_order() {
    let queue = BoundedDeque::new(8).unwrap();
    for i in 0..5 {
        queue.push(i);
    }
    queue.close();
    queue.close(); // no-op

    let drained: Vec<i32> = std::iter::from_fn(|| queue.front_pop()).collect();
    assert_eq!(drained, vec![0, 1, 2, 3, 4]);
    assert!(!queue.is_open());
}

#[test]
fn test_push_front_and_view() {
    let queue = BoundedDeque::new(4).unwrap();
    assert_eq!(queue.front_view(), None);

    queue.push("b".to_string());
    queue.push_front("a".to_string());

    assert_eq!(queue.front_view().as_deref(), Some("a"));
    assert_eq!(queue.size(), 2);
    assert_eq!(queue.try_front_pop().as_deref(), Some("a"));
    assert_eq!(queue.try_front_pop().as_deref(), Some("b"));
    assert_eq!(queue.try_front_pop(), None);
}

#[test]
fn test_clear_unblocks_pushers_and_returns_items() {
    let queue = BoundedDeque::new(2).unwrap();
    queue.push(1u32);
    queue.push(2u32);

    let pusher = {
        let queue = queue.clone();
        thread::spawn(move || queue.push(3))
    };

    thread::sleep(Duration::from_millis(20));
    let cleared = queue.clear();
    assert_eq!(cleared, vec![1, 2]);
    assert!(queue.is_open());

    assert!(pusher.join().unwrap());
    assert_eq!(queue.front_pop(), Some(3));

    let stats = queue.stats();
    assert_eq!(stats.total_cleared, 2);
    assert_eq!(stats.total_pushed, 3);
    assert_eq!(stats.total_popped, 1);
}

#[test]
fn test_single_producer_fifo_with_many_consumers() {
    let queue = BoundedDeque::new(16).unwrap();
    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Some(item) = queue.front_pop() {
                    seen.push(item);
                }
                seen
            })
        })
        .collect();

    for i in 0..10_000u64 {
        assert!(queue.push(i));
    }
    queue.close();

    let mut all = Vec::new();
    for consumer in consumers {
        let seen = consumer.join().unwrap();
        // Each consumer sees a subsequence of the producer's order.
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        all.extend(seen);
    }
    all.sort_unstable();
    assert_eq!(all, (0..10_000).collect::<Vec<_>>());
}

#[test]
fn test_occupancy_never_exceeds_capacity() {
    let queue = BoundedDeque::new(3).unwrap();
    let producers: Vec<_> = (0..4)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..2_000u32 {
                    queue.push(i);
                }
            })
        })
        .collect();

    let observer = {
        let queue = queue.clone();
        thread::spawn(move || {
            let mut max = 0;
            while queue.front_pop().is_some() {
                max = max.max(queue.size());
            }
            max
        })
    };

    for producer in producers {
        producer.join().unwrap();
    }
    queue.close();
    assert!(observer.join().unwrap() <= 3);
}
