//! Bounded blocking double-ended queue.
//!
//! [`BoundedDeque`] is the hand-off point between every pair of pipeline
//! stages:
//! - Fixed capacity with blocking backpressure (never drops while open)
//! - Any number of producers and consumers
//! - One-way open → closed lifecycle that wakes every blocked thread
//!
//! A closed queue rejects pushes but still hands out the items it holds, so
//! consumers drain it and stop only once it is closed *and* empty.

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// A capacity-bounded, thread-safe double-ended queue.
///
/// Cloning a `BoundedDeque` produces another handle to the same queue, which
/// is how producers and consumers on different threads share it.
///
/// # Example
///
/// ```rust
/// use litepipe::queue::BoundedDeque;
///
/// let queue = BoundedDeque::new(2).unwrap();
/// assert!(queue.push(1));
/// assert!(queue.push(2));
///
/// queue.close();
/// assert!(!queue.push(3)); // rejected once closed
///
/// // Remaining items still drain in order.
/// assert_eq!(queue.front_pop(), Some(1));
/// assert_eq!(queue.front_pop(), Some(2));
/// assert_eq!(queue.front_pop(), None);
/// ```
pub struct BoundedDeque<T> {
    inner: Arc<DequeInner<T>>,
}

struct DequeInner<T> {
    name: String,
    capacity: usize,
    state: Mutex<DequeState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

struct DequeState<T> {
    items: VecDeque<T>,
    open: bool,
    total_pushed: u64,
    total_popped: u64,
    total_rejected: u64,
    total_cleared: u64,
}

impl<T> DequeInner<T> {
    // No operation panics while holding the lock, so the state behind a
    // poisoned mutex is still consistent.
    fn lock(&self) -> MutexGuard<'_, DequeState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(
        &self,
        cond: &Condvar,
        guard: MutexGuard<'a, DequeState<T>>,
    ) -> MutexGuard<'a, DequeState<T>> {
        cond.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> BoundedDeque<T> {
    /// Create a queue holding at most `capacity` items.
    ///
    /// Returns [`Error::InvalidCapacity`] for a capacity of zero.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_name(format!("deque-{}", capacity), capacity)
    }

    /// Create a named queue. The name shows up in logs and metrics.
    pub fn with_name(name: impl Into<String>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        Ok(Self {
            inner: Arc::new(DequeInner {
                name: name.into(),
                capacity,
                state: Mutex::new(DequeState {
                    items: VecDeque::with_capacity(capacity.min(1024)),
                    open: true,
                    total_pushed: 0,
                    total_popped: 0,
                    total_rejected: 0,
                    total_cleared: 0,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
            }),
        })
    }

    /// Get the queue name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Get the maximum number of items the queue holds.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Append an item to the back of the queue.
    ///
    /// Blocks while the queue is full and open. Returns `true` once the item
    /// is enqueued, or `false` if the queue is (or becomes) closed; the item
    /// is dropped in that case and the caller should stop producing.
    pub fn push(&self, item: T) -> bool {
        self.push_with(item, VecDeque::push_back)
    }

    /// Insert an item at the front of the queue, so it is popped next.
    ///
    /// Same blocking and close semantics as [`push`](Self::push).
    pub fn push_front(&self, item: T) -> bool {
        self.push_with(item, VecDeque::push_front)
    }

    fn push_with(&self, item: T, insert: fn(&mut VecDeque<T>, T)) -> bool {
        let mut state = self.inner.lock();

        while state.open && state.items.len() >= self.inner.capacity {
            state = self.inner.wait(&self.inner.not_full, state);
        }

        if !state.open {
            state.total_rejected += 1;
            return false;
        }

        insert(&mut state.items, item);
        state.total_pushed += 1;
        drop(state);

        self.inner.not_empty.notify_one();
        true
    }

    /// Remove and return the front item.
    ///
    /// Blocks while the queue is empty and open. Returns `None` only when
    /// the queue is closed and empty.
    pub fn front_pop(&self) -> Option<T> {
        let mut state = self.inner.lock();

        loop {
            if let Some(item) = state.items.pop_front() {
                state.total_popped += 1;
                drop(state);
                self.inner.not_full.notify_one();
                return Some(item);
            }
            if !state.open {
                return None;
            }
            state = self.inner.wait(&self.inner.not_empty, state);
        }
    }

    /// Remove and return the front item without blocking.
    pub fn try_front_pop(&self) -> Option<T> {
        let mut state = self.inner.lock();
        let item = state.items.pop_front()?;
        state.total_popped += 1;
        drop(state);
        self.inner.not_full.notify_one();
        Some(item)
    }

    /// Get the current number of queued items.
    ///
    /// This is a snapshot; it says nothing about the next operation.
    pub fn size(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Alias for [`size`](Self::size).
    pub fn len(&self) -> usize {
        self.size()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Detach every queued item and hand them back to the caller.
    ///
    /// The open flag is unchanged. The returned items are the caller's to
    /// release. Wakes all blocked pushers.
    #[must_use = "cleared items are returned so the caller can release them"]
    pub fn clear(&self) -> Vec<T> {
        let mut state = self.inner.lock();
        let drained: Vec<T> = state.items.drain(..).collect();
        state.total_cleared += drained.len() as u64;
        drop(state);

        self.inner.not_full.notify_all();
        drained
    }

    /// Close the queue.
    ///
    /// Wakes every thread blocked in [`push`](Self::push) or
    /// [`front_pop`](Self::front_pop). Returns `true` if this call closed the
    /// queue and `false` if it was already closed.
    pub fn close(&self) -> bool {
        {
            let mut state = self.inner.lock();
            if !state.open {
                return false;
            }
            state.open = false;
        }

        tracing::debug!(queue = %self.inner.name, "queue closed");
        self.inner.not_empty.notify_all();
        self.inner.not_full.notify_all();
        true
    }

    /// Check whether the queue still accepts pushes.
    pub fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    /// Get statistics about queue operation.
    pub fn stats(&self) -> QueueStats {
        let state = self.inner.lock();
        QueueStats {
            len: state.items.len(),
            capacity: self.inner.capacity,
            open: state.open,
            total_pushed: state.total_pushed,
            total_popped: state.total_popped,
            total_rejected: state.total_rejected,
            total_cleared: state.total_cleared,
        }
    }
}

impl<T: Clone> BoundedDeque<T> {
    /// Get a copy of the front item without removing it.
    ///
    /// Never blocks; returns `None` when the queue is empty.
    pub fn front_view(&self) -> Option<T> {
        self.inner.lock().items.front().cloned()
    }
}

impl<T> Clone for BoundedDeque<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for BoundedDeque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("BoundedDeque")
            .field("name", &self.inner.name)
            .field("capacity", &stats.capacity)
            .field("len", &stats.len)
            .field("open", &stats.open)
            .finish()
    }
}

/// Statistics about queue operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Current number of queued items.
    pub len: usize,
    /// Maximum number of queued items.
    pub capacity: usize,
    /// Whether the queue still accepts pushes.
    pub open: bool,
    /// Total successful pushes (back and front).
    pub total_pushed: u64,
    /// Total successful pops.
    pub total_popped: u64,
    /// Pushes rejected because the queue was closed.
    pub total_rejected: u64,
    /// Items detached by `clear`.
    pub total_cleared: u64,
}

/// A queue that can be closed without knowing its item type.
///
/// Lets a single guard close a heterogeneous set of queues.
pub trait Closable: Send + Sync {
    /// Close the queue, returning `true` if this call closed it.
    fn close(&self) -> bool;

    /// Name of the queue, for logging.
    fn name(&self) -> &str;

    /// Check whether the queue still accepts pushes.
    fn is_open(&self) -> bool;
}

impl<T: Send> Closable for BoundedDeque<T> {
    fn close(&self) -> bool {
        BoundedDeque::close(self)
    }

    fn name(&self) -> &str {
        BoundedDeque::name(self)
    }

    fn is_open(&self) -> bool {
        BoundedDeque::is_open(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_deque_creation() {
        let queue = BoundedDeque::<u32>::new(10).unwrap();
        assert!(queue.is_empty());
        assert!(queue.is_open());
        assert_eq!(queue.capacity(), 10);
        assert_eq!(queue.name(), "deque-10");
    }

    #[test]
    fn test_deque_zero_capacity_rejected() {
        assert!(matches!(
            BoundedDeque::<u32>::new(0),
            Err(Error::InvalidCapacity)
        ));
    }

    #[test]
    fn test_deque_push_pop_fifo() {
        let queue = BoundedDeque::new(10).unwrap();

        for i in 0..5 {
            assert!(queue.push(i));
        }
        assert_eq!(queue.size(), 5);

        for i in 0..5 {
            assert_eq!(queue.front_pop(), Some(i));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_deque_push_front() {
        let queue = BoundedDeque::new(4).unwrap();
        queue.push(2);
        queue.push(3);
        queue.push_front(1);

        assert_eq!(queue.front_pop(), Some(1));
        assert_eq!(queue.front_pop(), Some(2));
        assert_eq!(queue.front_pop(), Some(3));
    }

    #[test]
    fn test_deque_front_view() {
        let queue = BoundedDeque::new(4).unwrap();
        assert_eq!(queue.front_view(), None);

        queue.push(0u32);
        queue.push(7);

        // A real default value is distinguishable from absence.
        assert_eq!(queue.front_view(), Some(0));
        assert_eq!(queue.size(), 2);
    }

    #[test]
    fn test_deque_try_front_pop() {
        let queue = BoundedDeque::new(4).unwrap();
        assert_eq!(queue.try_front_pop(), None);

        queue.push("a");
        assert_eq!(queue.try_front_pop(), Some("a"));
        assert_eq!(queue.stats().total_popped, 1);
    }

    #[test]
    fn test_deque_clear_returns_items() {
        let queue = BoundedDeque::new(4).unwrap();
        queue.push(1);
        queue.push(2);

        let cleared = queue.clear();
        assert_eq!(cleared, vec![1, 2]);
        assert!(queue.is_empty());
        assert!(queue.is_open());
        assert_eq!(queue.stats().total_cleared, 2);
    }

    #[test]
    fn test_deque_clear_wakes_blocked_pusher() {
        let queue = BoundedDeque::new(1).unwrap();
        queue.push(0);

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.push(1))
        };

        thread::sleep(Duration::from_millis(50));
        assert_eq!(queue.clear(), vec![0]);

        assert!(producer.join().unwrap());
        assert_eq!(queue.front_pop(), Some(1));
    }

    #[test]
    fn test_deque_close_is_idempotent() {
        let queue = BoundedDeque::<u8>::new(2).unwrap();
        assert!(queue.close());
        assert!(!queue.close());
        assert!(!queue.is_open());
    }

    #[test]
    fn test_deque_push_after_close_rejected() {
        let queue = BoundedDeque::new(2).unwrap();
        queue.close();

        assert!(!queue.push(1));
        assert!(!queue.push_front(2));
        assert!(queue.is_empty());
        assert_eq!(queue.stats().total_rejected, 2);
    }

    #[test]
    fn test_deque_drains_after_close() {
        let queue = BoundedDeque::new(4).unwrap();
        queue.push(1);
        queue.push(2);
        queue.close();

        assert_eq!(queue.front_pop(), Some(1));
        assert_eq!(queue.front_pop(), Some(2));
        assert_eq!(queue.front_pop(), None);
        assert_eq!(queue.front_pop(), None);
    }

    #[test]
    fn test_deque_close_wakes_blocked_popper() {
        let queue = BoundedDeque::<u32>::new(4).unwrap();

        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.front_pop())
        };

        // Give consumer time to start waiting
        thread::sleep(Duration::from_millis(50));
        queue.close();

        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn test_deque_close_wakes_blocked_pusher() {
        let queue = BoundedDeque::new(1).unwrap();
        queue.push(0);

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.push(1))
        };

        thread::sleep(Duration::from_millis(50));
        queue.close();

        assert!(!producer.join().unwrap());
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_deque_backpressure_blocks_until_pop() {
        let queue = BoundedDeque::new(2).unwrap();
        queue.push(0);
        queue.push(1);

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.push(2))
        };

        thread::sleep(Duration::from_millis(50));
        assert_eq!(queue.size(), 2);
        assert!(!producer.is_finished());

        assert_eq!(queue.front_pop(), Some(0));
        assert!(producer.join().unwrap());
        assert_eq!(queue.size(), 2);
    }

    #[test]
    fn test_deque_stats() {
        let queue = BoundedDeque::new(10).unwrap();
        queue.push(1);
        queue.push(2);
        queue.front_pop();

        let stats = queue.stats();
        assert_eq!(stats.total_pushed, 2);
        assert_eq!(stats.total_popped, 1);
        assert_eq!(stats.len, 1);
        assert!(stats.open);
    }

    #[test]
    fn test_closable_trait_object() {
        let queue = BoundedDeque::<String>::with_name("video", 4).unwrap();
        let handle: Box<dyn Closable> = Box::new(queue.clone());

        assert_eq!(handle.name(), "video");
        assert!(handle.close());
        assert!(!queue.is_open());
    }
}
