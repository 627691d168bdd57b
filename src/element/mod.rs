//! Stage contracts for litepipe pipelines.
//!
//! The pipeline treats its collaborators as narrow traits:
//!
//! - [`PacketSource`]: Produces packets in source order (container reader)
//! - [`Decoder`]: Turns a packet into zero or more frames (codec)
//! - [`FrameSink`]: Consumes frames at the presenter's pace (renderer)
//! - [`PacketSink`]: Consumes packets directly (audio output, recorder)
//!
//! # Design
//!
//! Implementations are **synchronous** and single-threaded: each one is
//! owned by exactly one stage thread. The stages handle queues, blocking,
//! and shutdown, so a collaborator only has to say what it does with one
//! item at a time.
//!
//! # Example
//!
//! ```rust
//! use litepipe::element::PacketSource;
//! use litepipe::media::{Packet, TrackKind};
//! use litepipe::Result;
//!
//! struct CounterSource {
//!     count: i64,
//!     max: i64,
//! }
//!
//! impl PacketSource for CounterSource {
//!     fn read_packet(&mut self) -> Result<Option<Packet>> {
//!         if self.count >= self.max {
//!             return Ok(None); // EOS
//!         }
//!         let packet = Packet::new(TrackKind::Video, 0, self.count, vec![0; 16]);
//!         self.count += 1;
//!         Ok(Some(packet))
//!     }
//! }
//! ```

mod traits;

pub use traits::{Decoder, FrameSink, PacketSink, PacketSource};
