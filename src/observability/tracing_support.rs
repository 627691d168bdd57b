//! Tracing integration for structured logging and spans.

use tracing::{Level, Span, span};

/// Create a span for a pipeline run.
///
/// # Example
///
/// ```rust
/// use litepipe::observability::span_pipeline;
///
/// let span = span_pipeline("playback");
/// let _guard = span.enter();
/// // Pipeline setup here...
/// ```
#[inline]
pub fn span_pipeline(name: &str) -> Span {
    span!(Level::INFO, "pipeline", name = %name)
}

/// Create a span for a stage thread.
#[inline]
pub fn span_stage(pipeline: &str, stage: &str) -> Span {
    span!(
        Level::DEBUG,
        "stage",
        pipeline = %pipeline,
        stage = %stage
    )
}

/// Log an error that stopped a stage.
#[inline]
pub fn trace_error(pipeline: &str, stage: &str, error: &dyn std::error::Error) {
    tracing::error!(
        pipeline = %pipeline,
        stage = %stage,
        error = %error,
        "stage failed"
    );
}

/// Log end-of-stream.
#[inline]
pub fn trace_eos(pipeline: &str, stage: &str) {
    tracing::info!(
        pipeline = %pipeline,
        stage = %stage,
        "end of stream"
    );
}

/// Log a stage state change.
#[inline]
pub fn trace_state_change(pipeline: &str, stage: &str, from: &str, to: &str) {
    tracing::debug!(
        pipeline = %pipeline,
        stage = %stage,
        from = %from,
        to = %to,
        "stage state changed"
    );
}
