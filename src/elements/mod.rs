//! Built-in pipeline stages.
//!
//! ## Producers
//! - [`Demuxer`]: Reads packets from a source and routes them by track
//!
//! ## Consumers
//! - [`DecodeStage`]: Decodes packets into frames (consumer and producer)
//! - [`PresentStage`]: Presents frames at a paced rate
//! - [`DrainStage`]: Hands packets to a sink as fast as they arrive
//!
//! ## Utilities
//! - [`Pacer`]: Fixed-interval scheduling for presentation
//! - [`testing`]: Synthetic sources, decoders, and sinks

mod decode;
mod demux;
mod drain;
mod pacer;
mod present;
pub mod testing;

pub use decode::DecodeStage;
pub use demux::Demuxer;
pub use drain::DrainStage;
pub use pacer::Pacer;
pub use present::PresentStage;
