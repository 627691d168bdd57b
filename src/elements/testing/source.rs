//! Synthetic packet source.

use crate::element::PacketSource;
use crate::error::{Error, Result};
use crate::media::{Packet, TrackKind};
use std::collections::VecDeque;

/// Stream index used for each track.
const VIDEO_STREAM: u32 = 0;
const AUDIO_STREAM: u32 = 1;
const OTHER_STREAM: u32 = 2;

/// A source that produces a fixed number of video packets, optionally
/// interleaved with audio and unroutable packets.
///
/// Each video packet is followed by `audio_per_video` audio packets, and
/// every `other_every`-th video packet is followed by one [`TrackKind::Other`]
/// packet. Video timestamps count up from zero.
///
/// # Example
///
/// ```rust
/// use litepipe::element::PacketSource;
/// use litepipe::elements::testing::SyntheticSource;
/// use litepipe::media::TrackKind;
///
/// let mut source = SyntheticSource::new(2).with_audio_per_video(1);
///
/// let tracks: Vec<TrackKind> = std::iter::from_fn(|| source.read_packet().unwrap())
///     .map(|p| p.track)
///     .collect();
/// assert_eq!(
///     tracks,
///     [TrackKind::Video, TrackKind::Audio, TrackKind::Video, TrackKind::Audio]
/// );
/// ```
pub struct SyntheticSource {
    name: String,
    video_count: u64,
    audio_per_video: u32,
    other_every: u64,
    payload_size: usize,
    fail_after: Option<u64>,
    next_video: u64,
    next_audio_pts: i64,
    emitted: u64,
    pending: VecDeque<Packet>,
}

impl SyntheticSource {
    /// Create a source producing `video_count` video packets.
    pub fn new(video_count: u64) -> Self {
        Self {
            name: "synthetic-source".to_string(),
            video_count,
            audio_per_video: 0,
            other_every: 0,
            payload_size: 16,
            fail_after: None,
            next_video: 0,
            next_audio_pts: 0,
            emitted: 0,
            pending: VecDeque::new(),
        }
    }

    /// Follow each video packet with `count` audio packets.
    pub fn with_audio_per_video(mut self, count: u32) -> Self {
        self.audio_per_video = count;
        self
    }

    /// Emit one unroutable packet after every `every` video packets
    /// (0 = never).
    pub fn with_other_every(mut self, every: u64) -> Self {
        self.other_every = every;
        self
    }

    /// Set the payload size of each packet in bytes.
    pub fn with_payload_size(mut self, size: usize) -> Self {
        self.payload_size = size;
        self
    }

    /// Fail with [`Error::Source`] once `count` packets have been read.
    pub fn with_fail_after(mut self, count: u64) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Total packets this source will produce if it does not fail.
    pub fn total_packets(&self) -> u64 {
        let others = if self.other_every == 0 {
            0
        } else {
            self.video_count / self.other_every
        };
        self.video_count * (1 + u64::from(self.audio_per_video)) + others
    }

    /// Number of packets read so far.
    pub fn packets_emitted(&self) -> u64 {
        self.emitted
    }

    fn payload(&self, seed: u64) -> Vec<u8> {
        let bytes = seed.to_le_bytes();
        (0..self.payload_size).map(|i| bytes[i % 8]).collect()
    }

    fn refill(&mut self) {
        if self.next_video >= self.video_count {
            return;
        }

        let index = self.next_video;
        self.next_video += 1;

        let video = Packet::new(TrackKind::Video, VIDEO_STREAM, index as i64, self.payload(index))
            .with_duration(1)
            .with_keyframe(index % 12 == 0);
        self.pending.push_back(video);

        for _ in 0..self.audio_per_video {
            let pts = self.next_audio_pts;
            self.next_audio_pts += 1;
            let audio = Packet::new(TrackKind::Audio, AUDIO_STREAM, pts, self.payload(pts as u64))
                .with_duration(1);
            self.pending.push_back(audio);
        }

        if self.other_every > 0 && (index + 1) % self.other_every == 0 {
            self.pending
                .push_back(Packet::new(TrackKind::Other, OTHER_STREAM, index as i64, Vec::new()));
        }
    }
}

impl PacketSource for SyntheticSource {
    fn read_packet(&mut self) -> Result<Option<Packet>> {
        if self.fail_after.is_some_and(|limit| self.emitted >= limit) {
            return Err(Error::Source(format!(
                "{}: read failed after {} packets",
                self.name, self.emitted
            )));
        }

        if self.pending.is_empty() {
            self.refill();
        }

        let packet = self.pending.pop_front();
        if packet.is_some() {
            self.emitted += 1;
        }
        Ok(packet)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut SyntheticSource) -> Vec<Packet> {
        std::iter::from_fn(|| source.read_packet().unwrap()).collect()
    }

    #[test]
    fn test_interleaving() {
        let mut source = SyntheticSource::new(4)
            .with_audio_per_video(2)
            .with_other_every(2);
        assert_eq!(source.total_packets(), 14);

        let packets = drain(&mut source);
        assert_eq!(packets.len(), 14);
        assert_eq!(source.packets_emitted(), 14);

        let video: Vec<i64> = packets
            .iter()
            .filter(|p| p.track == TrackKind::Video)
            .map(|p| p.pts)
            .collect();
        assert_eq!(video, vec![0, 1, 2, 3]);

        let audio: Vec<i64> = packets
            .iter()
            .filter(|p| p.track == TrackKind::Audio)
            .map(|p| p.pts)
            .collect();
        assert_eq!(audio, (0..8).collect::<Vec<_>>());

        assert_eq!(packets[3].track, TrackKind::Video);
        assert_eq!(packets[6].track, TrackKind::Other);
    }

    #[test]
    fn test_eos_is_sticky() {
        let mut source = SyntheticSource::new(1);
        assert!(source.read_packet().unwrap().is_some());
        assert!(source.read_packet().unwrap().is_none());
        assert!(source.read_packet().unwrap().is_none());
    }

    #[test]
    fn test_fail_after() {
        let mut source = SyntheticSource::new(10).with_fail_after(2);
        assert!(source.read_packet().is_ok());
        assert!(source.read_packet().is_ok());
        assert!(matches!(source.read_packet(), Err(Error::Source(_))));
    }

    #[test]
    fn test_payload_size() {
        let mut source = SyntheticSource::new(1).with_payload_size(100);
        assert_eq!(source.read_packet().unwrap().unwrap().len(), 100);
    }
}
