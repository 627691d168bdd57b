//! Paced presentation stage.
//!
//! Pops frames and hands them to a [`FrameSink`] no faster than one per
//! [`Pacer`] interval. Frames arriving late are presented immediately and
//! their lateness is recorded.

use crate::element::FrameSink;
use crate::error::Result;
use crate::media::Frame;
use crate::pipeline::{
    QueueCloser, Stage, StageContext, StageHandle, StopToken, consume_until_closed,
};
use crate::queue::BoundedDeque;
use std::ops::ControlFlow;

use super::Pacer;

/// Consumes frames at a paced rate.
pub struct PresentStage<K> {
    sink: K,
    input: BoundedDeque<Frame>,
    pacer: Pacer,
}

impl<K: FrameSink + 'static> PresentStage<K> {
    /// Create a presenter draining `input` into `sink`.
    pub fn new(sink: K, input: BoundedDeque<Frame>, pacer: Pacer) -> Self {
        Self { sink, input, pacer }
    }

    /// Spawn the stage as `present`.
    ///
    /// The stage closes its input on exit so upstream decoders stop if the
    /// sink fails.
    pub fn spawn(self, pipeline: &str, stop: StopToken) -> Result<StageHandle> {
        let closer = QueueCloser::new().with(self.input.clone());

        Stage::new(pipeline, "present")
            .with_stop_token(stop)
            .closing(closer)
            .spawn(move |ctx| self.run(ctx))
    }

    /// Run the presentation loop on the current thread.
    pub fn run(self, ctx: &mut StageContext) -> Result<()> {
        let Self {
            mut sink,
            input,
            mut pacer,
        } = self;
        let interval = pacer.interval();

        consume_until_closed(&input, ctx, |ctx, frame| {
            let lag = pacer.wait();
            if !interval.is_zero() {
                ctx.metrics().record_present_lag(lag);
                if lag > interval {
                    tracing::warn!(pts = frame.pts, lag_ms = lag.as_millis() as u64, "late frame");
                }
            }

            sink.present(frame)?;
            ctx.record_out();
            Ok(ControlFlow::Continue(()))
        })?;

        tracing::debug!(
            sink = %sink.name(),
            presented = pacer.ticks(),
            late = pacer.late_ticks(),
            "presentation finished"
        );
        Ok(())
    }
}
