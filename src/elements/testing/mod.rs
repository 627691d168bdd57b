//! Synthetic collaborators for tests, benches, and demos.
//!
//! - [`SyntheticSource`]: Generates interleaved video/audio/other packets
//! - [`SyntheticDecoder`]: Turns each packet into one pooled frame
//! - [`NullSink`]: Discards frames and packets, counting them
//! - [`CollectSink`]: Records timestamps of everything it receives

mod decoder;
mod null;
mod source;

pub use decoder::SyntheticDecoder;
pub use null::{CollectHandle, CollectSink, NullSink};
pub use source::SyntheticSource;
