//! Stage threads: lifecycle, cancellation, and guaranteed queue shutdown.
//!
//! A stage is one OS thread acting as producer, consumer, or both. Every
//! stage moves through [`StageState`] `Idle → Running → Draining → Stopped`
//! and never backwards. The queues a stage touches are handed to it as a
//! [`QueueCloser`]; the closer is dropped on every exit path (normal
//! return, error, or panic unwind) before the stage reports `Stopped`, so a
//! stopped producer has always closed its queues and every consumer
//! downstream is guaranteed to wake up. Consumers close their input the
//! same way, which stops the producer feeding them.

use crate::error::{Error, Result};
use crate::observability::{StageMetrics, span_stage, trace_error, trace_state_change};
use crate::queue::{BoundedDeque, Closable};
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{self, JoinHandle};

// ============================================================================
// Stage State
// ============================================================================

/// Lifecycle state of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum StageState {
    /// Created, thread not running yet.
    #[default]
    Idle = 0,
    /// Thread is processing items.
    Running = 1,
    /// Input is finished or a stop was requested; shutting down.
    Draining = 2,
    /// Thread is done and every owned queue is closed.
    Stopped = 3,
}

impl StageState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => StageState::Idle,
            1 => StageState::Running,
            2 => StageState::Draining,
            _ => StageState::Stopped,
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageState::Idle => write!(f, "Idle"),
            StageState::Running => write!(f, "Running"),
            StageState::Draining => write!(f, "Draining"),
            StageState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Shared, observable state of one stage.
#[derive(Debug, Clone, Default)]
pub struct StageStatus {
    state: Arc<AtomicU8>,
}

impl StageStatus {
    /// Create a status in the `Idle` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state.
    pub fn get(&self) -> StageState {
        StageState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move forward to `to`. Returns the previous state if the state changed;
    /// backwards moves are ignored.
    fn advance(&self, to: StageState) -> Option<StageState> {
        let previous = StageState::from_u8(self.state.fetch_max(to as u8, Ordering::AcqRel));
        (previous < to).then_some(previous)
    }
}

// ============================================================================
// Stop Token
// ============================================================================

/// One-shot cooperative cancellation flag.
///
/// Producers check it between source reads. Requesting a stop does not wake
/// blocked threads by itself; pair it with closing the queues.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    requested: Arc<AtomicBool>,
}

impl StopToken {
    /// Create a token with no stop requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Returns `true` if this call made the request.
    pub fn request_stop(&self) -> bool {
        !self.requested.swap(true, Ordering::AcqRel)
    }

    /// Check whether a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

// ============================================================================
// Queue Closer
// ============================================================================

/// Closes a set of queues when dropped.
///
/// Wrap it in an `Arc` to share it between stages that feed the same queue:
/// the queue closes when the last of them finishes.
///
/// # Example
///
/// ```rust
/// use litepipe::pipeline::QueueCloser;
/// use litepipe::queue::BoundedDeque;
///
/// let video = BoundedDeque::<u32>::new(4).unwrap();
/// let audio = BoundedDeque::<u32>::new(4).unwrap();
///
/// {
///     let _closer = QueueCloser::new().with(video.clone()).with(audio.clone());
/// }
///
/// assert!(!video.is_open());
/// assert!(!audio.is_open());
/// ```
#[derive(Default)]
pub struct QueueCloser {
    queues: Vec<Box<dyn Closable>>,
}

impl QueueCloser {
    /// Create an empty closer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a queue to close.
    pub fn with(mut self, queue: impl Closable + 'static) -> Self {
        self.add(queue);
        self
    }

    /// Add a queue to close.
    pub fn add(&mut self, queue: impl Closable + 'static) {
        self.queues.push(Box::new(queue));
    }

    /// Number of queues held.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Check if no queues are held.
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Close every held queue now. Returns how many were still open.
    pub fn close_all(&mut self) -> usize {
        let mut closed = 0;
        for queue in self.queues.drain(..) {
            if queue.close() {
                closed += 1;
            }
        }
        closed
    }
}

impl Drop for QueueCloser {
    fn drop(&mut self) {
        self.close_all();
    }
}

impl fmt::Debug for QueueCloser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.queues.iter().map(|q| q.name()))
            .finish()
    }
}

// ============================================================================
// Stage Context
// ============================================================================

/// Per-thread context handed to a stage body.
pub struct StageContext {
    pipeline: String,
    name: String,
    stop: StopToken,
    status: StageStatus,
    metrics: StageMetrics,
    closers: Vec<Arc<QueueCloser>>,
    items_in: u64,
    items_out: u64,
    items_dropped: u64,
}

impl StageContext {
    /// Get the stage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the pipeline name.
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Get the stop token.
    pub fn stop_token(&self) -> &StopToken {
        &self.stop
    }

    /// Check whether a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_stop_requested()
    }

    /// Get the stage metrics.
    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// Count an item received.
    pub fn record_in(&mut self) {
        self.items_in += 1;
        self.metrics.record_in();
    }

    /// Count an item emitted.
    pub fn record_out(&mut self) {
        self.items_out += 1;
        self.metrics.record_out();
    }

    /// Count an item discarded.
    pub fn record_dropped(&mut self) {
        self.items_dropped += 1;
        self.metrics.record_dropped();
    }

    /// Returns `true` once every `every` emitted items, for periodic
    /// sampling of gauges.
    pub fn metrics_tick(&self, every: u64) -> bool {
        every > 0 && self.items_out % every == 0
    }

    /// Mark the stage as shutting down.
    pub fn begin_draining(&self) {
        self.transition(StageState::Draining);
    }

    /// Get the current state.
    pub fn state(&self) -> StageState {
        self.status.get()
    }

    fn transition(&self, to: StageState) {
        if let Some(from) = self.status.advance(to) {
            trace_state_change(&self.pipeline, &self.name, &from.to_string(), &to.to_string());
        }
    }

    fn report(&self) -> StageReport {
        StageReport {
            name: self.name.clone(),
            items_in: self.items_in,
            items_out: self.items_out,
            items_dropped: self.items_dropped,
        }
    }
}

impl Drop for StageContext {
    fn drop(&mut self) {
        self.begin_draining();
        self.closers.clear();
        self.transition(StageState::Stopped);
    }
}

/// Counters reported by a finished stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Stage name.
    pub name: String,
    /// Items received (read from a source or popped from a queue).
    pub items_in: u64,
    /// Items emitted (pushed downstream or presented).
    pub items_out: u64,
    /// Items discarded.
    pub items_dropped: u64,
}

// ============================================================================
// Stage
// ============================================================================

/// Builder for a stage thread.
///
/// # Example
///
/// ```rust
/// use litepipe::pipeline::{QueueCloser, Stage};
/// use litepipe::queue::BoundedDeque;
///
/// let queue = BoundedDeque::new(8).unwrap();
///
/// let producer = {
///     let queue = queue.clone();
///     Stage::new("example", "counter")
///         .closing(QueueCloser::new().with(queue.clone()))
///         .spawn(move |ctx| {
///             for i in 0..5u32 {
///                 if !queue.push(i) {
///                     break;
///                 }
///                 ctx.record_out();
///             }
///             Ok(())
///         })
///         .unwrap()
/// };
///
/// let report = producer.join().unwrap();
/// assert_eq!(report.items_out, 5);
/// assert!(!queue.is_open());
/// ```
pub struct Stage {
    pipeline: String,
    name: String,
    stop: StopToken,
    closers: Vec<Arc<QueueCloser>>,
}

impl Stage {
    /// Create a stage builder.
    pub fn new(pipeline: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            name: name.into(),
            stop: StopToken::new(),
            closers: Vec::new(),
        }
    }

    /// Share a stop token with other stages.
    pub fn with_stop_token(mut self, stop: StopToken) -> Self {
        self.stop = stop;
        self
    }

    /// Give the stage sole ownership of the queues it must close.
    pub fn closing(self, closer: QueueCloser) -> Self {
        self.closing_shared(Arc::new(closer))
    }

    /// Share queue ownership with sibling stages; the queues close when the
    /// last sibling stops.
    pub fn closing_shared(mut self, closer: Arc<QueueCloser>) -> Self {
        self.closers.push(closer);
        self
    }

    /// Spawn the stage thread.
    ///
    /// If the thread cannot be spawned the owned queues are closed before
    /// the error is returned.
    pub fn spawn<F>(self, body: F) -> Result<StageHandle>
    where
        F: FnOnce(&mut StageContext) -> Result<()> + Send + 'static,
    {
        let status = StageStatus::new();
        let ctx = StageContext {
            metrics: StageMetrics::new(&self.pipeline, &self.name),
            pipeline: self.pipeline,
            name: self.name.clone(),
            stop: self.stop,
            status: status.clone(),
            closers: self.closers,
            items_in: 0,
            items_out: 0,
            items_dropped: 0,
        };

        let thread = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || run_stage(ctx, body))?;

        Ok(StageHandle {
            name: self.name,
            status,
            thread,
        })
    }
}

fn run_stage<F>(mut ctx: StageContext, body: F) -> Result<StageReport>
where
    F: FnOnce(&mut StageContext) -> Result<()>,
{
    let span = span_stage(&ctx.pipeline, &ctx.name);
    let _guard = span.enter();

    ctx.transition(StageState::Running);
    tracing::info!("stage started");

    let result = body(&mut ctx);
    let report = ctx.report();
    if let Err(err) = &result {
        trace_error(&ctx.pipeline, &ctx.name, err);
    }
    drop(ctx);

    tracing::info!(
        items_in = report.items_in,
        items_out = report.items_out,
        items_dropped = report.items_dropped,
        "stage stopped"
    );
    result.map(|()| report)
}

/// Handle to a running stage thread.
pub struct StageHandle {
    name: String,
    status: StageStatus,
    thread: JoinHandle<Result<StageReport>>,
}

impl StageHandle {
    /// Get the stage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current stage state.
    pub fn state(&self) -> StageState {
        self.status.get()
    }

    /// Check whether the thread has finished.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the stage to finish.
    ///
    /// A panic inside the stage is reported as [`Error::StagePanicked`].
    pub fn join(self) -> Result<StageReport> {
        match self.thread.join() {
            Ok(result) => result,
            Err(_) => Err(Error::StagePanicked(self.name)),
        }
    }
}

impl fmt::Debug for StageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageHandle")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// Consumer Loop
// ============================================================================

/// Pop items until the queue is closed and empty, the handler breaks, or a
/// stop is requested.
///
/// Only closed-and-empty ends the loop on its own; an empty pop while the
/// queue is still open is retried.
pub fn consume_until_closed<T, F>(
    queue: &BoundedDeque<T>,
    ctx: &mut StageContext,
    mut handle: F,
) -> Result<()>
where
    F: FnMut(&mut StageContext, T) -> Result<ControlFlow<()>>,
{
    while !ctx.is_stop_requested() {
        match queue.front_pop() {
            Some(item) => {
                ctx.record_in();
                if handle(ctx, item)?.is_break() {
                    break;
                }
            }
            None if queue.is_open() => thread::yield_now(),
            None => break,
        }
    }
    Ok(())
}
