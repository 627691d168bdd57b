//! Drain stage.
//!
//! Pops packets and hands each one to a [`PacketSink`]. Used for tracks
//! that have no frame queue of their own, such as audio in the default
//! topology. Several drain stages may share one queue.

use crate::element::PacketSink;
use crate::error::Result;
use crate::media::Packet;
use crate::pipeline::{
    QueueCloser, Stage, StageContext, StageHandle, StopToken, consume_until_closed,
};
use crate::queue::BoundedDeque;
use std::ops::ControlFlow;

/// Consumes packets until the queue is closed and empty.
pub struct DrainStage<K> {
    sink: K,
    input: BoundedDeque<Packet>,
}

impl<K: PacketSink + 'static> DrainStage<K> {
    /// Create a drain stage.
    pub fn new(sink: K, input: BoundedDeque<Packet>) -> Self {
        Self { sink, input }
    }

    /// Spawn the stage. Closes its input on exit.
    pub fn spawn(self, pipeline: &str, name: &str, stop: StopToken) -> Result<StageHandle> {
        let closer = QueueCloser::new().with(self.input.clone());

        Stage::new(pipeline, name)
            .with_stop_token(stop)
            .closing(closer)
            .spawn(move |ctx| self.run(ctx))
    }

    /// Run the drain loop on the current thread.
    pub fn run(self, ctx: &mut StageContext) -> Result<()> {
        let Self { mut sink, input } = self;

        consume_until_closed(&input, ctx, |ctx, packet| {
            sink.consume(packet)?;
            ctx.record_out();
            Ok(ControlFlow::Continue(()))
        })
    }
}
