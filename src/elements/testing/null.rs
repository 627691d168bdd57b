//! Terminal sinks: NullSink and CollectSink.

use crate::element::{FrameSink, PacketSink};
use crate::error::{Error, Result};
use crate::media::{Frame, Packet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A sink that discards everything it receives.
///
/// Clones share one counter, so a clone kept outside the pipeline can read
/// how many items the sink consumed.
///
/// This is useful for:
/// - Benchmarking pipeline throughput
/// - Draining a queue without side effects
///
/// # Example
///
/// ```rust
/// use litepipe::element::FrameSink;
/// use litepipe::elements::testing::NullSink;
/// use litepipe::media::{Frame, FramePool, TrackKind};
///
/// let pool = FramePool::new(16, 4);
/// let mut sink = NullSink::new();
/// let probe = sink.clone();
///
/// sink.present(Frame::new(TrackKind::Video, 0, 4, 4, pool.acquire())).unwrap();
///
/// assert_eq!(probe.count(), 1);
/// assert_eq!(pool.outstanding(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct NullSink {
    name: String,
    count: Arc<AtomicU64>,
}

impl NullSink {
    /// Create a new NullSink.
    pub fn new() -> Self {
        Self::with_name("nullsink")
    }

    /// Create a new NullSink with a custom name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get the number of items consumed by this sink and its clones.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for NullSink {
    fn present(&mut self, _frame: Frame) -> Result<()> {
        self.count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl PacketSink for NullSink {
    fn consume(&mut self, _packet: Packet) -> Result<()> {
        self.count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A sink that records the timestamp of every item it receives.
///
/// Frames are released as soon as their timestamp is recorded. Read the
/// results through a [`CollectHandle`].
#[derive(Debug)]
pub struct CollectSink {
    name: String,
    seen: Arc<Mutex<Vec<i64>>>,
    fail_after: Option<usize>,
}

impl CollectSink {
    /// Create a new CollectSink.
    pub fn new() -> Self {
        Self {
            name: "collectsink".to_string(),
            seen: Arc::new(Mutex::new(Vec::new())),
            fail_after: None,
        }
    }

    /// Fail once `count` items have been accepted.
    pub fn with_fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Get a handle for reading what the sink recorded.
    pub fn handle(&self) -> CollectHandle {
        CollectHandle {
            seen: Arc::clone(&self.seen),
        }
    }

    fn record(&mut self, pts: i64) -> Result<()> {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if self.fail_after.is_some_and(|limit| seen.len() >= limit) {
            return Err(Error::Present(format!(
                "{}: output failed after {} items",
                self.name,
                seen.len()
            )));
        }
        seen.push(pts);
        Ok(())
    }
}

impl Default for CollectSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for CollectSink {
    fn present(&mut self, frame: Frame) -> Result<()> {
        self.record(frame.pts)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl PacketSink for CollectSink {
    fn consume(&mut self, packet: Packet) -> Result<()> {
        self.record(packet.pts)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Read access to what a [`CollectSink`] recorded.
#[derive(Debug, Clone)]
pub struct CollectHandle {
    seen: Arc<Mutex<Vec<i64>>>,
}

impl CollectHandle {
    /// Timestamps in arrival order.
    pub fn pts(&self) -> Vec<i64> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of items recorded.
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::TrackKind;

    #[test]
    fn test_null_sink_counts_packets() {
        let mut sink = NullSink::with_name("audio");
        for pts in 0..3 {
            sink.consume(Packet::new(TrackKind::Audio, 1, pts, vec![])).unwrap();
        }
        assert_eq!(sink.count(), 3);
        assert_eq!(PacketSink::name(&sink), "audio");
    }

    #[test]
    fn test_collect_sink_fail_after() {
        let mut sink = CollectSink::new().with_fail_after(2);
        let handle = sink.handle();

        sink.consume(Packet::new(TrackKind::Audio, 1, 10, vec![])).unwrap();
        sink.consume(Packet::new(TrackKind::Audio, 1, 11, vec![])).unwrap();
        let result = sink.consume(Packet::new(TrackKind::Audio, 1, 12, vec![]));

        assert!(matches!(result, Err(Error::Present(_))));
        assert_eq!(handle.pts(), vec![10, 11]);
    }
}
