//! Decode stage.
//!
//! Pops packets from one queue, runs them through a [`Decoder`], and pushes
//! the resulting frames into another queue. Several decode stages may share
//! the same input queue; each packet is decoded by exactly one of them.

use crate::element::Decoder;
use crate::error::{Error, Result};
use crate::media::{Frame, Packet};
use crate::observability::record_queue_depth;
use crate::pipeline::{
    QueueCloser, Stage, StageContext, StageHandle, StopToken, consume_until_closed,
};
use crate::queue::BoundedDeque;
use std::ops::ControlFlow;
use std::sync::Arc;

/// Consumes packets and forwards decoded frames.
pub struct DecodeStage<D> {
    decoder: D,
    input: BoundedDeque<Packet>,
    output: BoundedDeque<Frame>,
}

impl<D: Decoder + 'static> DecodeStage<D> {
    /// Create a decode stage between two queues.
    pub fn new(decoder: D, input: BoundedDeque<Packet>, output: BoundedDeque<Frame>) -> Self {
        Self {
            decoder,
            input,
            output,
        }
    }

    /// Spawn the stage.
    ///
    /// `output_closer` is shared by every decode stage feeding the same
    /// output queue, so the queue closes when the last of them stops. The
    /// stage also closes its own input on exit, which stops the upstream
    /// producer if this stage dies early.
    pub fn spawn(
        self,
        pipeline: &str,
        name: &str,
        stop: StopToken,
        output_closer: Arc<QueueCloser>,
    ) -> Result<StageHandle> {
        let input_closer = QueueCloser::new().with(self.input.clone());

        Stage::new(pipeline, name)
            .with_stop_token(stop)
            .closing(input_closer)
            .closing_shared(output_closer)
            .spawn(move |ctx| self.run(ctx))
    }

    /// Run the decode loop on the current thread.
    pub fn run(self, ctx: &mut StageContext) -> Result<()> {
        let Self {
            mut decoder,
            input,
            output,
        } = self;
        let mut downstream_closed = false;

        consume_until_closed(&input, ctx, |ctx, packet| {
            let pts = packet.pts;
            let frames = match decoder.decode(packet) {
                Ok(frames) => frames,
                Err(Error::Decode(reason)) => {
                    tracing::warn!(pts, %reason, "skipping undecodable packet");
                    ctx.record_dropped();
                    return Ok(ControlFlow::Continue(()));
                }
                Err(err) => return Err(err),
            };

            let flow = forward(&output, ctx, frames);
            downstream_closed = flow.is_break();
            Ok(flow)
        })?;

        ctx.begin_draining();
        if downstream_closed || ctx.is_stop_requested() {
            return Ok(());
        }

        let frames = decoder.flush()?;
        if !frames.is_empty() {
            tracing::debug!(frames = frames.len(), decoder = %decoder.name(), "flushed decoder");
        }
        forward(&output, ctx, frames);
        Ok(())
    }
}

/// Push frames downstream; breaks once the queue rejects a push. Frames not
/// pushed are released here.
fn forward(
    output: &BoundedDeque<Frame>,
    ctx: &mut StageContext,
    frames: Vec<Frame>,
) -> ControlFlow<()> {
    for frame in frames {
        if !output.push(frame) {
            tracing::debug!(queue = %output.name(), "frame queue closed, stopping");
            return ControlFlow::Break(());
        }
        ctx.record_out();
        if ctx.metrics_tick(32) {
            record_queue_depth(output.name(), output.size());
        }
    }
    ControlFlow::Continue(())
}
