//! Synthetic decoder.

use crate::element::Decoder;
use crate::error::{Error, Result};
use crate::media::{Frame, FramePool, Packet};
use std::collections::VecDeque;

/// A decoder that turns every packet into one frame from a [`FramePool`].
///
/// The frame copies the packet's track and timestamp, and the start of its
/// payload holds the packet data. Failure modes can be switched on to
/// exercise the pipeline's error paths.
pub struct SyntheticDecoder {
    name: String,
    pool: FramePool,
    width: u32,
    height: u32,
    error_every: u64,
    panic_after: Option<u64>,
    delay_frames: usize,
    calls: u64,
    held: VecDeque<Frame>,
}

impl SyntheticDecoder {
    /// Create a decoder drawing frames from `pool`.
    pub fn new(pool: FramePool) -> Self {
        Self {
            name: "synthetic-decoder".to_string(),
            pool,
            width: 0,
            height: 0,
            error_every: 0,
            panic_after: None,
            delay_frames: 0,
            calls: 0,
            held: VecDeque::new(),
        }
    }

    /// Set the reported frame dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Fail every `every`-th packet with [`Error::Decode`] (0 = never).
    pub fn with_error_every(mut self, every: u64) -> Self {
        self.error_every = every;
        self
    }

    /// Panic on the packet after the first `count` packets.
    pub fn with_panic_after(mut self, count: u64) -> Self {
        self.panic_after = Some(count);
        self
    }

    /// Hold back up to `count` frames, releasing them in order on flush.
    pub fn with_delay_frames(mut self, count: usize) -> Self {
        self.delay_frames = count;
        self
    }

    /// Set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Decoder for SyntheticDecoder {
    fn decode(&mut self, packet: Packet) -> Result<Vec<Frame>> {
        if self.panic_after.is_some_and(|limit| self.calls >= limit) {
            panic!("{}: decoder crashed at pts {}", self.name, packet.pts);
        }
        self.calls += 1;

        if self.error_every > 0 && self.calls % self.error_every == 0 {
            return Err(Error::Decode(format!("corrupt packet at pts {}", packet.pts)));
        }

        let mut buffer = self.pool.acquire();
        let len = buffer.len().min(packet.data.len());
        buffer[..len].copy_from_slice(&packet.data[..len]);
        self.held.push_back(Frame::new(
            packet.track,
            packet.pts,
            self.width,
            self.height,
            buffer,
        ));

        let ready = self.held.len().saturating_sub(self.delay_frames);
        Ok(self.held.drain(..ready).collect())
    }

    fn flush(&mut self) -> Result<Vec<Frame>> {
        Ok(self.held.drain(..).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::TrackKind;

    fn packet(pts: i64) -> Packet {
        Packet::new(TrackKind::Video, 0, pts, vec![7; 4])
    }

    #[test]
    fn test_one_frame_per_packet() {
        let pool = FramePool::new(8, 4);
        let mut decoder = SyntheticDecoder::new(pool.clone()).with_dimensions(4, 2);

        let frames = decoder.decode(packet(3)).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pts, 3);
        assert_eq!(frames[0].width, 4);
        assert_eq!(&frames[0].data()[..5], &[7, 7, 7, 7, 0]);

        drop(frames);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_error_every() {
        let mut decoder = SyntheticDecoder::new(FramePool::new(8, 4)).with_error_every(2);
        assert!(decoder.decode(packet(0)).is_ok());
        assert!(matches!(decoder.decode(packet(1)), Err(Error::Decode(_))));
        assert!(decoder.decode(packet(2)).is_ok());
    }

    #[test]
    fn test_delay_and_flush() {
        let mut decoder = SyntheticDecoder::new(FramePool::new(8, 4)).with_delay_frames(1);
        assert!(decoder.decode(packet(0)).unwrap().is_empty());
        assert_eq!(decoder.decode(packet(1)).unwrap()[0].pts, 0);

        let flushed = decoder.flush().unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].pts, 1);
        assert!(decoder.flush().unwrap().is_empty());
    }

    #[test]
    #[should_panic(expected = "decoder crashed")]
    fn test_panic_after() {
        let mut decoder = SyntheticDecoder::new(FramePool::new(8, 4)).with_panic_after(1);
        let _ = decoder.decode(packet(0));
        let _ = decoder.decode(packet(1));
    }
}
