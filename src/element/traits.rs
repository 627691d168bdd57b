//! Core stage contract traits.

use crate::error::Result;
use crate::media::{Frame, Packet};

// ============================================================================
// Source Trait
// ============================================================================

/// A source of encoded packets.
///
/// # Lifecycle
///
/// - `read_packet()` is called repeatedly by the demuxer stage
/// - Return `Ok(Some(packet))` to emit a packet
/// - Return `Ok(None)` to signal end-of-stream (EOS)
/// - Return `Err(...)` to signal a read failure; the stage stops and
///   closes its queues either way
pub trait PacketSource: Send {
    /// Read the next packet.
    fn read_packet(&mut self) -> Result<Option<Packet>>;

    /// Get the name of this source (for debugging/logging).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<S: PacketSource + ?Sized> PacketSource for Box<S> {
    fn read_packet(&mut self) -> Result<Option<Packet>> {
        (**self).read_packet()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ============================================================================
// Decoder Trait
// ============================================================================

/// A codec that turns packets into frames.
///
/// A decoder may buffer internally, so one packet can yield zero, one, or
/// several frames. Returning [`Error::Decode`](crate::Error::Decode) skips the
/// packet; any other error stops the decode stage.
pub trait Decoder: Send {
    /// Decode one packet.
    fn decode(&mut self, packet: Packet) -> Result<Vec<Frame>>;

    /// Emit any frames still buffered at end of stream.
    fn flush(&mut self) -> Result<Vec<Frame>> {
        Ok(Vec::new())
    }

    /// Get the name of this decoder (for debugging/logging).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn decode(&mut self, packet: Packet) -> Result<Vec<Frame>> {
        (**self).decode(packet)
    }

    fn flush(&mut self) -> Result<Vec<Frame>> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ============================================================================
// Sink Traits
// ============================================================================

/// A consumer of decoded frames, e.g. a renderer.
///
/// Ownership of the frame moves into `present`; dropping it releases the
/// payload back to its pool.
pub trait FrameSink: Send {
    /// Present one frame.
    fn present(&mut self, frame: Frame) -> Result<()>;

    /// Get the name of this sink (for debugging/logging).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn present(&mut self, frame: Frame) -> Result<()> {
        (**self).present(frame)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A consumer of encoded packets, e.g. an audio output that decodes
/// internally.
pub trait PacketSink: Send {
    /// Consume one packet.
    fn consume(&mut self, packet: Packet) -> Result<()>;

    /// Get the name of this sink (for debugging/logging).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<S: PacketSink + ?Sized> PacketSink for Box<S> {
    fn consume(&mut self, packet: Packet) -> Result<()> {
        (**self).consume(packet)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
