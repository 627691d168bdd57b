//! Contention harness for [`BoundedDeque`].
//!
//! Runs N producer stages and M consumer stages against one small queue,
//! then shuts down in order: join the producers, let the consumers settle,
//! close the queue, join the consumers. The accounting is checked against
//! the queue's guarantees and any mismatch is reported as
//! [`Error::InvariantViolated`].

use crate::error::{Error, Result};
use crate::pipeline::{QueueCloser, Stage, StageContext, StageReport, consume_until_closed};
use crate::queue::{BoundedDeque, QueueStats};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// An item type the harness can generate and identify again after it has
/// crossed the queue.
pub trait TestValue: Send + 'static {
    /// Largest index this type can encode.
    const MAX_INDEX: u64;

    /// Build the value for a global item index.
    fn make(index: u64) -> Self;

    /// Recover the index the value was built from.
    fn index(&self) -> Option<u64>;
}

macro_rules! impl_test_value_int {
    ($($ty:ty),*) => {
        $(
            impl TestValue for $ty {
                const MAX_INDEX: u64 = <$ty>::MAX as u64;

                fn make(index: u64) -> Self {
                    index as $ty
                }

                fn index(&self) -> Option<u64> {
                    u64::try_from(*self).ok()
                }
            }
        )*
    };
}

impl_test_value_int!(u32, u64, usize, i64);

impl TestValue for String {
    const MAX_INDEX: u64 = u64::MAX;

    fn make(index: u64) -> Self {
        format!("val_{}", index)
    }

    fn index(&self) -> Option<u64> {
        self.strip_prefix("val_")?.parse().ok()
    }
}

/// Harness parameters.
///
/// The default is 4 producers pushing 100,000 items each into a queue of
/// 64, drained by 4 consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressConfig {
    /// Number of producer threads.
    pub producers: usize,
    /// Number of consumer threads.
    pub consumers: usize,
    /// Queue capacity.
    pub capacity: usize,
    /// Pushes per producer.
    pub items_per_producer: u64,
    /// Pause between the last producer finishing and the close.
    pub settle: Duration,
    /// Producers yield the CPU every this many pushes (0 = never).
    pub yield_every: u64,
    /// Track every popped item to check uniqueness, completeness, and
    /// per-producer order. Costs one `u64` per item.
    pub verify_items: bool,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            producers: 4,
            consumers: 4,
            capacity: 64,
            items_per_producer: 100_000,
            settle: Duration::from_millis(100),
            yield_every: 256,
            verify_items: true,
        }
    }
}

impl StressConfig {
    /// Set the number of producers.
    pub fn with_producers(mut self, count: usize) -> Self {
        self.producers = count;
        self
    }

    /// Set the number of consumers.
    pub fn with_consumers(mut self, count: usize) -> Self {
        self.consumers = count;
        self
    }

    /// Set the queue capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the pushes per producer.
    pub fn with_items_per_producer(mut self, count: u64) -> Self {
        self.items_per_producer = count;
        self
    }

    /// Set the settle pause.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Enable or disable per-item verification.
    pub fn with_verify_items(mut self, verify: bool) -> Self {
        self.verify_items = verify;
        self
    }

    /// Total pushes across all producers.
    pub fn total_items(&self) -> u64 {
        self.producers as u64 * self.items_per_producer
    }

    /// Check the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.producers == 0 || self.consumers == 0 {
            return Err(Error::InvalidConfig(
                "stress run needs at least one producer and one consumer".to_string(),
            ));
        }
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        Ok(())
    }
}

/// Outcome of a stress run.
#[derive(Debug, Clone)]
pub struct StressReport {
    /// Pushes attempted.
    pub push_attempts: u64,
    /// Pushes the queue accepted.
    pub push_successes: u64,
    /// Pops that returned an item.
    pub pop_successes: u64,
    /// Queue length when it was closed.
    pub size_at_close: usize,
    /// Queue length after every consumer finished.
    pub final_size: usize,
    /// Queue counters after the run.
    pub queue: QueueStats,
    /// Per-stage counters, producers first.
    pub stages: Vec<StageReport>,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl StressReport {
    /// Pops per second over the whole run.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.pop_successes as f64 / secs
    }
}

#[derive(Default)]
struct Counters {
    push_attempts: AtomicU64,
    push_successes: AtomicU64,
    pop_successes: AtomicU64,
}

/// Run the harness with items of type `T`.
///
/// # Example
///
/// ```rust
/// use litepipe::stress::{StressConfig, run_stress};
/// use std::time::Duration;
///
/// let config = StressConfig::default()
///     .with_items_per_producer(1_000)
///     .with_settle(Duration::from_millis(10));
///
/// let report = run_stress::<u64>(&config).unwrap();
/// assert_eq!(report.push_successes, 4_000);
/// assert_eq!(report.final_size, 0);
/// ```
pub fn run_stress<T: TestValue>(config: &StressConfig) -> Result<StressReport> {
    config.validate()?;
    let total = config.total_items();
    if total > 0 && total - 1 > T::MAX_INDEX {
        return Err(Error::InvalidConfig(format!(
            "{} items do not fit in {}",
            total,
            std::any::type_name::<T>()
        )));
    }

    let started = Instant::now();
    let queue = BoundedDeque::<T>::with_name("stress", config.capacity)?;
    let counters = Arc::new(Counters::default());
    let popped = Arc::new(Mutex::new(Vec::new()));

    // Closes the queue if we bail out early, so consumers never hang.
    let mut guard = QueueCloser::new().with(queue.clone());

    let mut consumers = Vec::with_capacity(config.consumers);
    for id in 0..config.consumers {
        let body = consumer_body(queue.clone(), Arc::clone(&counters), Arc::clone(&popped), config.clone());
        // A consumer that fails closes the queue so producers cannot block
        // on it forever.
        let stage = Stage::new("stress", format!("consumer-{}", id))
            .closing(QueueCloser::new().with(queue.clone()));
        consumers.push(stage.spawn(body)?);
    }

    let mut producers = Vec::with_capacity(config.producers);
    for id in 0..config.producers {
        let body = producer_body(queue.clone(), Arc::clone(&counters), id as u64, config.clone());
        producers.push(Stage::new("stress", format!("producer-{}", id)).spawn(body)?);
    }

    let mut stages = Vec::with_capacity(config.producers + config.consumers);
    for producer in producers {
        stages.push(producer.join()?);
    }

    std::thread::sleep(config.settle);
    let size_at_close = queue.size();
    guard.close_all();

    for consumer in consumers {
        stages.push(consumer.join()?);
    }

    let report = StressReport {
        push_attempts: counters.push_attempts.load(Ordering::Acquire),
        push_successes: counters.push_successes.load(Ordering::Acquire),
        pop_successes: counters.pop_successes.load(Ordering::Acquire),
        size_at_close,
        final_size: queue.size(),
        queue: queue.stats(),
        stages,
        elapsed: started.elapsed(),
    };

    tracing::info!(
        push_attempts = report.push_attempts,
        push_successes = report.push_successes,
        pop_successes = report.pop_successes,
        size_at_close = report.size_at_close,
        final_size = report.final_size,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "stress run finished"
    );

    check_accounting(&report, total)?;
    if config.verify_items {
        let mut seen = std::mem::take(&mut *popped.lock().unwrap_or_else(PoisonError::into_inner));
        check_items(&mut seen, report.pop_successes, total)?;
    }
    Ok(report)
}

fn producer_body<T: TestValue>(
    queue: BoundedDeque<T>,
    counters: Arc<Counters>,
    id: u64,
    config: StressConfig,
) -> impl FnOnce(&mut StageContext) -> Result<()> + Send + 'static {
    let count = config.items_per_producer;
    let yield_every = config.yield_every;

    move |ctx| {
        for i in 0..count {
            counters.push_attempts.fetch_add(1, Ordering::AcqRel);
            if !queue.push(T::make(id * count + i)) {
                break;
            }
            counters.push_successes.fetch_add(1, Ordering::AcqRel);
            ctx.record_out();

            if yield_every > 0 && i % yield_every == 0 {
                std::thread::yield_now();
            }
        }
        Ok(())
    }
}

fn consumer_body<T: TestValue>(
    queue: BoundedDeque<T>,
    counters: Arc<Counters>,
    popped: Arc<Mutex<Vec<u64>>>,
    config: StressConfig,
) -> impl FnOnce(&mut StageContext) -> Result<()> + Send + 'static {
    let verify = config.verify_items;
    let per_producer = config.items_per_producer.max(1);
    let producers = config.producers;
    let capacity = config.capacity;

    move |ctx| {
        let mut seen = Vec::new();
        let mut last_seq: Vec<Option<u64>> = vec![None; producers];

        consume_until_closed(&queue, ctx, |ctx, item| {
            counters.pop_successes.fetch_add(1, Ordering::AcqRel);
            ctx.record_out();
            if !verify {
                return Ok(ControlFlow::Continue(()));
            }

            let len = queue.size();
            if len > capacity {
                return Err(Error::InvariantViolated(format!(
                    "queue holds {} items, capacity is {}",
                    len, capacity
                )));
            }

            let index = item.index().ok_or_else(|| {
                Error::InvariantViolated("popped a value the harness never built".to_string())
            })?;
            let producer = (index / per_producer) as usize;
            let seq = index % per_producer;
            let last = last_seq.get_mut(producer).ok_or_else(|| {
                Error::InvariantViolated(format!("index {} has no producer", index))
            })?;
            if last.is_some_and(|prev| prev >= seq) {
                return Err(Error::InvariantViolated(format!(
                    "producer {} item {} popped after item {}",
                    producer,
                    seq,
                    last.unwrap_or_default()
                )));
            }
            *last = Some(seq);
            seen.push(index);
            Ok(ControlFlow::Continue(()))
        })?;

        popped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(seen);
        Ok(())
    }
}

fn check_accounting(report: &StressReport, total: u64) -> Result<()> {
    let violation = |msg: String| Err(Error::InvariantViolated(msg));

    if report.push_attempts != total {
        return violation(format!("{} push attempts, expected {}", report.push_attempts, total));
    }
    if report.push_successes < report.pop_successes {
        return violation(format!(
            "popped {} items but only {} were pushed",
            report.pop_successes, report.push_successes
        ));
    }
    let in_flight = report.push_successes - report.pop_successes;
    if report.final_size as u64 != in_flight {
        return violation(format!(
            "queue holds {} items, accounting says {}",
            report.final_size, in_flight
        ));
    }
    if report.final_size != 0 {
        return violation(format!("{} items left after consumers finished", report.final_size));
    }
    if report.queue.total_pushed != report.push_successes
        || report.queue.total_popped != report.pop_successes
    {
        return violation(format!(
            "queue counted {} pushes and {} pops, harness counted {} and {}",
            report.queue.total_pushed,
            report.queue.total_popped,
            report.push_successes,
            report.pop_successes
        ));
    }
    Ok(())
}

fn check_items(seen: &mut [u64], pops: u64, total: u64) -> Result<()> {
    if seen.len() as u64 != pops {
        return Err(Error::InvariantViolated(format!(
            "recorded {} items for {} pops",
            seen.len(),
            pops
        )));
    }

    seen.sort_unstable();
    if let Some(pair) = seen.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(Error::InvariantViolated(format!("item {} popped twice", pair[0])));
    }
    // Nothing is closed while producers run, so every push lands.
    if pops == total && seen.iter().copied().ne(0..total) {
        return Err(Error::InvariantViolated("popped items are not the pushed items".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> StressConfig {
        StressConfig::default()
            .with_items_per_producer(2_000)
            .with_settle(Duration::from_millis(5))
    }

    #[test]
    fn test_test_value_roundtrip() {
        assert_eq!(String::make(42), "val_42");
        assert_eq!("val_42".to_string().index(), Some(42));
        assert_eq!("other".to_string().index(), None);
        assert_eq!(7u32.index(), Some(7));
        assert_eq!((-1i64).index(), None);
    }

    #[test]
    fn test_small_run_u32() {
        let report = run_stress::<u32>(&small()).unwrap();
        assert_eq!(report.push_attempts, 8_000);
        assert_eq!(report.push_successes, 8_000);
        assert_eq!(report.pop_successes, 8_000);
        assert_eq!(report.final_size, 0);
        assert_eq!(report.stages.len(), 8);
    }

    #[test]
    fn test_single_slot_queue() {
        let config = small().with_capacity(1).with_producers(2).with_consumers(3);
        let report = run_stress::<String>(&config).unwrap();
        assert_eq!(report.pop_successes, 4_000);
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(matches!(
            run_stress::<u64>(&small().with_consumers(0)),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            run_stress::<u64>(&small().with_capacity(0)),
            Err(Error::InvalidCapacity)
        ));
    }

    #[test]
    fn test_check_items_detects_duplicates() {
        let mut seen = vec![0, 1, 1];
        assert!(matches!(
            check_items(&mut seen, 3, 3),
            Err(Error::InvariantViolated(_))
        ));
    }
}
