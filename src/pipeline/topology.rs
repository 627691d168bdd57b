//! The playback topology.
//!
//! ```text
//!                  ┌─► video packets ─► decode-0..N ─► frames ─► present
//! source ─► demux ─┤
//!                  └─► audio packets ─► audio-0..M
//! ```
//!
//! Every queue is closed by the stages on both of its ends, so a failure in
//! any stage tears the whole pipeline down: downstream stages drain what is
//! left and finish, upstream stages see a rejected push and stop.

use super::config::PipelineConfig;
use super::stage::{QueueCloser, StageHandle, StageReport, StageState, StopToken};
use crate::element::{Decoder, FrameSink, PacketSink, PacketSource};
use crate::elements::{DecodeStage, Demuxer, DrainStage, Pacer, PresentStage};
use crate::error::{Error, Result};
use crate::media::{Frame, Packet};
use crate::observability::{init_metrics, span_pipeline};
use crate::queue::{BoundedDeque, QueueStats};
use std::sync::Arc;

/// A configured, not yet started pipeline.
///
/// # Example
///
/// ```rust
/// use litepipe::elements::testing::{NullSink, SyntheticDecoder, SyntheticSource};
/// use litepipe::media::FramePool;
/// use litepipe::pipeline::{Pipeline, PipelineConfig};
/// use std::time::Duration;
///
/// let config = PipelineConfig::default().with_frame_interval(Duration::ZERO);
/// let pool = FramePool::new(64, 8);
/// let presenter = NullSink::new();
///
/// let report = Pipeline::new(config)
///     .unwrap()
///     .start(
///         SyntheticSource::new(20).with_audio_per_video(2),
///         |_| SyntheticDecoder::new(pool.clone()),
///         presenter.clone(),
///         |_| NullSink::new(),
///     )
///     .unwrap()
///     .wait()
///     .unwrap();
///
/// assert_eq!(report.presented(), 20);
/// assert_eq!(report.audio_drained(), 40);
/// assert_eq!(pool.outstanding(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline from a validated configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        init_metrics();
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the queues and spawn every stage.
    ///
    /// `decoder_factory` is called once per video decode stage and
    /// `audio_sink_factory` once per audio drain stage, each with the
    /// stage index. If a stage fails to spawn, the stages already running
    /// are stopped and joined before the error is returned.
    pub fn start<S, D, F, K, A, G>(
        self,
        source: S,
        mut decoder_factory: F,
        presenter: K,
        mut audio_sink_factory: G,
    ) -> Result<RunningPipeline>
    where
        S: PacketSource + 'static,
        D: Decoder + 'static,
        F: FnMut(usize) -> D,
        K: FrameSink + 'static,
        A: PacketSink + 'static,
        G: FnMut(usize) -> A,
    {
        let config = self.config;
        let span = span_pipeline(&config.name);
        let _guard = span.enter();

        let mut running = RunningPipeline {
            name: config.name.clone(),
            stop: StopToken::new(),
            video: BoundedDeque::with_name("video-packets", config.video_queue_capacity)?,
            audio: BoundedDeque::with_name("audio-packets", config.audio_queue_capacity)?,
            frames: BoundedDeque::with_name("frames", config.frame_queue_capacity)?,
            stages: Vec::new(),
        };

        // Consumers first, so nothing is pushed before someone can pop it.
        let present = PresentStage::new(
            presenter,
            running.frames.clone(),
            Pacer::new(config.frame_interval),
        );
        running
            .stages
            .push(present.spawn(&config.name, running.stop.clone())?);

        let frame_closer = Arc::new(QueueCloser::new().with(running.frames.clone()));
        for i in 0..config.video_decoders {
            let stage = DecodeStage::new(
                decoder_factory(i),
                running.video.clone(),
                running.frames.clone(),
            );
            let handle = stage.spawn(
                &config.name,
                &format!("decode-{}", i),
                running.stop.clone(),
                Arc::clone(&frame_closer),
            )?;
            running.stages.push(handle);
        }
        drop(frame_closer);

        for i in 0..config.audio_consumers {
            let stage = DrainStage::new(audio_sink_factory(i), running.audio.clone());
            let handle = stage.spawn(&config.name, &format!("audio-{}", i), running.stop.clone())?;
            running.stages.push(handle);
        }

        let demux = Demuxer::new(source, running.video.clone(), running.audio.clone());
        running
            .stages
            .push(demux.spawn(&config.name, running.stop.clone())?);

        tracing::info!(
            stages = running.stages.len(),
            decoders = config.video_decoders,
            audio_consumers = config.audio_consumers,
            frame_interval_ms = config.frame_interval.as_millis() as u64,
            "pipeline started"
        );
        Ok(running)
    }
}

/// A pipeline whose stages are running.
///
/// Dropping it without calling [`wait`](Self::wait) stops and joins every
/// stage.
pub struct RunningPipeline {
    name: String,
    stop: StopToken,
    video: BoundedDeque<Packet>,
    audio: BoundedDeque<Packet>,
    frames: BoundedDeque<Frame>,
    stages: Vec<StageHandle>,
}

impl RunningPipeline {
    /// Get the pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the stop token shared by every stage.
    pub fn stop_token(&self) -> &StopToken {
        &self.stop
    }

    /// Request a stop and close every queue.
    ///
    /// Blocked stages wake up immediately. Items still queued are released
    /// by [`wait`](Self::wait).
    pub fn stop(&self) {
        if self.stop.request_stop() {
            tracing::info!(pipeline = %self.name, "stopping pipeline");
        }
        self.video.close();
        self.audio.close();
        self.frames.close();
    }

    /// Snapshot of every queue, by name.
    pub fn queue_stats(&self) -> Vec<(String, QueueStats)> {
        vec![
            (self.video.name().to_string(), self.video.stats()),
            (self.audio.name().to_string(), self.audio.stats()),
            (self.frames.name().to_string(), self.frames.stats()),
        ]
    }

    /// Current state of every stage, by name.
    pub fn stage_states(&self) -> Vec<(String, StageState)> {
        self.stages
            .iter()
            .map(|stage| (stage.name().to_string(), stage.state()))
            .collect()
    }

    /// Check whether every stage thread has finished.
    pub fn is_finished(&self) -> bool {
        self.stages.iter().all(StageHandle::is_finished)
    }

    /// Wait for every stage to finish.
    ///
    /// Returns the first stage error in spawn order; later errors are
    /// logged. Items left in the queues are released either way.
    pub fn wait(mut self) -> Result<PipelineReport> {
        let (reports, first_error) = self.join_stages();
        let leftover_released = self.release_leftovers();

        if let Some(err) = first_error {
            return Err(err);
        }

        tracing::info!(pipeline = %self.name, leftover_released, "pipeline finished");
        Ok(PipelineReport {
            name: self.name.clone(),
            stages: reports,
            leftover_released,
        })
    }

    fn join_stages(&mut self) -> (Vec<StageReport>, Option<Error>) {
        let mut reports = Vec::with_capacity(self.stages.len());
        let mut first_error = None;

        for stage in self.stages.drain(..) {
            let name = stage.name().to_string();
            match stage.join() {
                Ok(report) => reports.push(report),
                Err(err) if first_error.is_none() => first_error = Some(err),
                Err(err) => {
                    tracing::warn!(pipeline = %self.name, stage = %name, error = %err, "additional stage failure");
                }
            }
        }
        (reports, first_error)
    }

    fn release_leftovers(&self) -> usize {
        self.video.close();
        self.audio.close();
        self.frames.close();

        let released = self.video.clear().len() + self.audio.clear().len() + self.frames.clear().len();
        if released > 0 {
            tracing::debug!(pipeline = %self.name, released, "released queued items");
        }
        released
    }
}

impl Drop for RunningPipeline {
    fn drop(&mut self) {
        if self.stages.is_empty() {
            return;
        }
        self.stop();
        self.join_stages();
        self.release_leftovers();
    }
}

impl std::fmt::Debug for RunningPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningPipeline")
            .field("name", &self.name)
            .field("stages", &self.stages)
            .finish()
    }
}

/// Summary of a finished pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Pipeline name.
    pub name: String,
    /// One report per stage, in spawn order.
    pub stages: Vec<StageReport>,
    /// Items still queued at shutdown and released by the pipeline.
    pub leftover_released: usize,
}

impl PipelineReport {
    /// Look up a stage by name.
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    /// Packets routed by the demuxer.
    pub fn demuxed(&self) -> u64 {
        self.stage("demux").map_or(0, |stage| stage.items_out)
    }

    /// Packets the demuxer dropped because no queue takes their track.
    pub fn unrouted(&self) -> u64 {
        self.stage("demux").map_or(0, |stage| stage.items_dropped)
    }

    /// Frames produced by all decode stages.
    pub fn decoded(&self) -> u64 {
        self.sum_out("decode-")
    }

    /// Packets skipped by all decode stages.
    pub fn decode_errors(&self) -> u64 {
        self.stages
            .iter()
            .filter(|stage| stage.name.starts_with("decode-"))
            .map(|stage| stage.items_dropped)
            .sum()
    }

    /// Frames presented.
    pub fn presented(&self) -> u64 {
        self.stage("present").map_or(0, |stage| stage.items_out)
    }

    /// Packets consumed by all audio drain stages.
    pub fn audio_drained(&self) -> u64 {
        self.sum_out("audio-")
    }

    fn sum_out(&self, prefix: &str) -> u64 {
        self.stages
            .iter()
            .filter(|stage| stage.name.starts_with(prefix))
            .map(|stage| stage.items_out)
            .sum()
    }
}
