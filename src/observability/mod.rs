//! Observability features: metrics and tracing.
//!
//! - **Metrics**: Counters, gauges, and histograms via `metrics-rs`
//! - **Tracing**: Structured logging and spans via `tracing`
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `litepipe_items_in` | Counter | Items a stage popped or read |
//! | `litepipe_items_out` | Counter | Items a stage pushed or presented |
//! | `litepipe_items_dropped` | Counter | Items a stage discarded |
//! | `litepipe_queue_depth` | Gauge | Items waiting in a queue |
//! | `litepipe_present_lag_ns` | Histogram | How late a frame was presented |
//!
//! No exporter is bundled; install any `metrics` recorder to collect them.
//!
//! ## Tracing
//!
//! Every stage thread runs inside a `stage` span carrying the pipeline and
//! stage names, so events from concurrent stages stay attributable.

mod metrics;
mod tracing_support;

pub use self::metrics::{StageMetrics, init_metrics, record_queue_depth};
pub use self::tracing_support::{span_pipeline, span_stage, trace_eos, trace_error, trace_state_change};
