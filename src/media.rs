//! Media items carried through the pipeline.
//!
//! - [`Packet`]: an encoded unit read from a source, tagged with its track
//! - [`Frame`]: a decoded unit whose payload is borrowed from a [`FramePool`]
//!
//! A frame owns its payload; dropping the frame is the one release
//! operation and hands the payload back to the pool it came from. Queues
//! never release items themselves: whoever pops (or clears) an item owns it.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Which track a packet or frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// Video track.
    Video,
    /// Audio track.
    Audio,
    /// Anything else (subtitles, data, attachments).
    Other,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Other => write!(f, "other"),
        }
    }
}

/// An encoded packet in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Track this packet belongs to.
    pub track: TrackKind,
    /// Index of the stream in the source.
    pub stream_index: u32,
    /// Presentation timestamp in stream time base units.
    pub pts: i64,
    /// Duration in stream time base units.
    pub duration: i64,
    /// Whether the packet starts a keyframe.
    pub keyframe: bool,
    /// Encoded payload.
    pub data: Vec<u8>,
}

impl Packet {
    /// Create a packet for a track.
    pub fn new(track: TrackKind, stream_index: u32, pts: i64, data: Vec<u8>) -> Self {
        Self {
            track,
            stream_index,
            pts,
            duration: 0,
            keyframe: false,
            data,
        }
    }

    /// Set the packet duration.
    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    /// Mark the packet as a keyframe.
    pub fn with_keyframe(mut self, keyframe: bool) -> Self {
        self.keyframe = keyframe;
        self
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ============================================================================
// Frame Pool
// ============================================================================

/// A pool of reusable frame payloads.
///
/// Payloads come back to the pool when the [`FrameBuffer`] holding them is
/// dropped. The pool never blocks: when no payload is free a new one is
/// allocated, so backpressure stays the job of the queues.
///
/// # Example
///
/// ```rust
/// use litepipe::media::FramePool;
///
/// let pool = FramePool::new(16, 4);
/// let buffer = pool.acquire();
/// assert_eq!(pool.outstanding(), 1);
///
/// drop(buffer);
/// assert_eq!(pool.outstanding(), 0);
/// ```
#[derive(Clone)]
pub struct FramePool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    frame_size: usize,
    max_free: usize,
    free: Mutex<Vec<Vec<u8>>>,
    outstanding: AtomicUsize,
    allocations: AtomicU64,
    reuses: AtomicU64,
}

impl PoolInner {
    fn release(&self, mut data: Vec<u8>) {
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.max_free {
            data.clear();
            free.push(data);
        }
    }
}

impl FramePool {
    /// Create a pool of `frame_size`-byte payloads, keeping at most
    /// `max_free` released payloads around for reuse.
    pub fn new(frame_size: usize, max_free: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                frame_size,
                max_free,
                free: Mutex::new(Vec::with_capacity(max_free)),
                outstanding: AtomicUsize::new(0),
                allocations: AtomicU64::new(0),
                reuses: AtomicU64::new(0),
            }),
        }
    }

    /// Take a zero-filled payload from the pool.
    pub fn acquire(&self) -> FrameBuffer {
        let recycled = self
            .inner
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let mut data = match recycled {
            Some(data) => {
                self.inner.reuses.fetch_add(1, Ordering::Relaxed);
                data
            }
            None => {
                self.inner.allocations.fetch_add(1, Ordering::Relaxed);
                Vec::with_capacity(self.inner.frame_size)
            }
        };
        data.resize(self.inner.frame_size, 0);
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);

        FrameBuffer {
            data,
            pool: Arc::clone(&self.inner),
        }
    }

    /// Payload size in bytes.
    pub fn frame_size(&self) -> usize {
        self.inner.frame_size
    }

    /// Number of payloads handed out and not yet released.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Get pool statistics.
    pub fn stats(&self) -> FramePoolStats {
        FramePoolStats {
            outstanding: self.outstanding(),
            free: self
                .inner
                .free
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            allocations: self.inner.allocations.load(Ordering::Relaxed),
            reuses: self.inner.reuses.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for FramePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePool")
            .field("frame_size", &self.inner.frame_size)
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// Statistics about frame pool usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramePoolStats {
    /// Payloads currently held by frames.
    pub outstanding: usize,
    /// Released payloads waiting for reuse.
    pub free: usize,
    /// Payloads allocated fresh.
    pub allocations: u64,
    /// Acquisitions served from the free list.
    pub reuses: u64,
}

/// A payload borrowed from a [`FramePool`]; returned to it on drop.
pub struct FrameBuffer {
    data: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl Deref for FrameBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for FrameBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.data));
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("len", &self.data.len())
            .finish()
    }
}

// ============================================================================
// Frame
// ============================================================================

/// A decoded frame.
#[derive(Debug)]
pub struct Frame {
    /// Track the frame was decoded from.
    pub track: TrackKind,
    /// Presentation timestamp, copied from the source packet.
    pub pts: i64,
    /// Width in pixels (0 for audio).
    pub width: u32,
    /// Height in pixels (0 for audio).
    pub height: u32,
    buffer: FrameBuffer,
}

impl Frame {
    /// Create a frame around a pooled payload.
    pub fn new(track: TrackKind, pts: i64, width: u32, height: u32, buffer: FrameBuffer) -> Self {
        Self {
            track,
            pts,
            width,
            height,
            buffer,
        }
    }

    /// Get the frame payload.
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the frame payload mutably.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Release the frame, returning its payload to the pool.
    ///
    /// Equivalent to dropping it; spelled out for call sites where the
    /// release is the point.
    pub fn release(self) {}
}
