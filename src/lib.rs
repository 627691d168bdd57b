//! # litepipe
//!
//! A small threaded media pipeline built around one primitive: a bounded,
//! blocking, closable double-ended queue.
//!
//! ## Features
//!
//! - **Blocking backpressure**: [`BoundedDeque`](queue::BoundedDeque) never drops while open
//! - **Cooperative shutdown**: closing a queue wakes every blocked thread
//! - **Stages that clean up**: a stage closes its queues on every exit path,
//!   including panics
//! - **Owned frames**: dropping a [`Frame`](media::Frame) returns its payload
//!   to the pool
//! - **Stress harness**: checks the queue's guarantees under contention
//!
//! ## Quick Start
//!
//! ```rust
//! use litepipe::prelude::*;
//! use litepipe::elements::testing::{NullSink, SyntheticDecoder, SyntheticSource};
//! use std::time::Duration;
//!
//! let pool = FramePool::new(1024, 16);
//! let config = PipelineConfig::default().with_frame_interval(Duration::ZERO);
//!
//! let running = Pipeline::new(config)?.start(
//!     SyntheticSource::new(100).with_audio_per_video(2),
//!     |_| SyntheticDecoder::new(pool.clone()),
//!     NullSink::new(),
//!     |_| NullSink::new(),
//! )?;
//!
//! let report = running.wait()?;
//! assert_eq!(report.presented(), 100);
//! # Ok::<(), litepipe::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod element;
pub mod elements;
pub mod error;
pub mod media;
pub mod observability;
pub mod pipeline;
pub mod queue;
pub mod stress;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::element::{Decoder, FrameSink, PacketSink, PacketSource};
    pub use crate::error::{Error, Result};
    pub use crate::media::{Frame, FramePool, Packet, TrackKind};
    pub use crate::pipeline::{Pipeline, PipelineConfig, RunningPipeline, StopToken};
    pub use crate::queue::BoundedDeque;
}

pub use error::{Error, Result};
