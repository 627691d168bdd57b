//! Pipeline construction and execution.
//!
//! - [`Stage`]: One thread of the pipeline, with a lifecycle and owned queues
//! - [`StopToken`]: Cooperative cancellation shared by every stage
//! - [`QueueCloser`]: Closes a stage's queues on every exit path
//! - [`Pipeline`]: Wires the playback topology from a [`PipelineConfig`]
//! - [`RunningPipeline`]: Handle for stopping and joining a started pipeline

mod config;
mod stage;
mod topology;

pub use config::{
    ENV_AUDIO_CONSUMERS, ENV_FRAME_INTERVAL_MS, ENV_FRAME_QUEUE_CAPACITY,
    ENV_PACKET_QUEUE_CAPACITY, ENV_VIDEO_DECODERS, PipelineConfig,
};
pub use stage::{
    QueueCloser, Stage, StageContext, StageHandle, StageReport, StageState, StageStatus,
    StopToken, consume_until_closed,
};
pub use topology::{Pipeline, PipelineReport, RunningPipeline};
