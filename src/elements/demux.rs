//! Demultiplexer stage.
//!
//! Reads packets from a [`PacketSource`] and routes each one by its
//! [`TrackKind`]: video packets to the video queue, audio packets to the
//! audio queue. Packets of any other kind are counted and dropped.
//!
//! The demuxer owns both queues. Whatever ends its loop (end of stream, a
//! read error, a stop request, or a rejected push) both queues are closed,
//! never just one.

use crate::element::PacketSource;
use crate::error::Result;
use crate::media::{Packet, TrackKind};
use crate::observability::{record_queue_depth, trace_eos};
use crate::pipeline::{QueueCloser, Stage, StageContext, StageHandle, StopToken};
use crate::queue::BoundedDeque;

/// How often (in routed packets) queue depth gauges are refreshed.
const DEPTH_SAMPLE_INTERVAL: u64 = 32;

/// Routes packets from a source into per-track queues.
///
/// # Example
///
/// ```rust
/// use litepipe::elements::Demuxer;
/// use litepipe::elements::testing::SyntheticSource;
/// use litepipe::pipeline::StopToken;
/// use litepipe::queue::BoundedDeque;
///
/// let video = BoundedDeque::with_name("video", 16).unwrap();
/// let audio = BoundedDeque::with_name("audio", 16).unwrap();
///
/// let source = SyntheticSource::new(4).with_audio_per_video(1);
/// let demux = Demuxer::new(source, video.clone(), audio.clone());
/// let report = demux.spawn("example", StopToken::new()).unwrap().join().unwrap();
///
/// assert_eq!(report.items_out, 8);
/// assert_eq!(video.size(), 4);
/// assert!(!video.is_open() && !audio.is_open());
/// ```
pub struct Demuxer<S> {
    source: S,
    video: BoundedDeque<Packet>,
    audio: BoundedDeque<Packet>,
}

impl<S: PacketSource + 'static> Demuxer<S> {
    /// Create a demuxer feeding the given queues.
    pub fn new(source: S, video: BoundedDeque<Packet>, audio: BoundedDeque<Packet>) -> Self {
        Self {
            source,
            video,
            audio,
        }
    }

    /// Spawn the demuxer as the `demux` stage.
    pub fn spawn(self, pipeline: &str, stop: StopToken) -> Result<StageHandle> {
        let closer = QueueCloser::new()
            .with(self.video.clone())
            .with(self.audio.clone());

        Stage::new(pipeline, "demux")
            .with_stop_token(stop)
            .closing(closer)
            .spawn(move |ctx| self.run(ctx))
    }

    /// Run the demux loop on the current thread.
    ///
    /// The caller is responsible for closing the queues afterwards; use
    /// [`spawn`](Self::spawn) to get that guaranteed.
    pub fn run(mut self, ctx: &mut StageContext) -> Result<()> {
        tracing::debug!(source = %self.source.name(), "demuxing");

        while !ctx.is_stop_requested() {
            let Some(packet) = self.source.read_packet()? else {
                trace_eos(ctx.pipeline(), ctx.name());
                break;
            };
            ctx.record_in();

            let queue = match packet.track {
                TrackKind::Video => &self.video,
                TrackKind::Audio => &self.audio,
                TrackKind::Other => {
                    tracing::trace!(stream = packet.stream_index, "dropping unrouted packet");
                    ctx.record_dropped();
                    continue;
                }
            };

            if !queue.push(packet) {
                tracing::debug!(queue = %queue.name(), "downstream queue closed, stopping");
                break;
            }
            ctx.record_out();

            if ctx.metrics_tick(DEPTH_SAMPLE_INTERVAL) {
                record_queue_depth(self.video.name(), self.video.size());
                record_queue_depth(self.audio.name(), self.audio.size());
            }
        }

        ctx.begin_draining();
        Ok(())
    }
}
