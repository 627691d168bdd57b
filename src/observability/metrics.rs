//! Metrics collection using metrics-rs.

use metrics::{Counter, Histogram, Unit, counter, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

const ITEMS_IN: &str = "litepipe_items_in";
const ITEMS_OUT: &str = "litepipe_items_out";
const ITEMS_DROPPED: &str = "litepipe_items_dropped";
const QUEUE_DEPTH: &str = "litepipe_queue_depth";
const PRESENT_LAG_NS: &str = "litepipe_present_lag_ns";

/// Initialize metrics descriptions.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(ITEMS_IN, Unit::Count, "Items received by a stage");
    metrics::describe_counter!(ITEMS_OUT, Unit::Count, "Items emitted by a stage");
    metrics::describe_counter!(
        ITEMS_DROPPED,
        Unit::Count,
        "Items discarded by a stage (unrouted packets, skipped decodes)"
    );
    metrics::describe_gauge!(QUEUE_DEPTH, Unit::Count, "Items waiting in a queue");
    metrics::describe_histogram!(
        PRESENT_LAG_NS,
        Unit::Nanoseconds,
        "Delay between a frame's scheduled and actual presentation"
    );
}

/// Record the current depth of a queue.
#[inline]
pub fn record_queue_depth(queue: &str, depth: usize) {
    gauge!(QUEUE_DEPTH, "queue" => queue.to_string()).set(depth as f64);
}

/// Metrics collector for one stage.
///
/// Handles are registered once at construction, so recording is cheap on
/// the hot path.
#[derive(Clone)]
pub struct StageMetrics {
    pipeline: String,
    stage: String,
    items_in: Counter,
    items_out: Counter,
    items_dropped: Counter,
    present_lag: Histogram,
}

impl StageMetrics {
    /// Create a new stage metrics collector.
    pub fn new(pipeline: &str, stage: &str) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            stage: stage.to_string(),
            items_in: counter!(
                ITEMS_IN,
                "pipeline" => pipeline.to_string(),
                "stage" => stage.to_string()
            ),
            items_out: counter!(
                ITEMS_OUT,
                "pipeline" => pipeline.to_string(),
                "stage" => stage.to_string()
            ),
            items_dropped: counter!(
                ITEMS_DROPPED,
                "pipeline" => pipeline.to_string(),
                "stage" => stage.to_string()
            ),
            present_lag: histogram!(
                PRESENT_LAG_NS,
                "pipeline" => pipeline.to_string(),
                "stage" => stage.to_string()
            ),
        }
    }

    /// Record an incoming item.
    #[inline]
    pub fn record_in(&self) {
        self.items_in.increment(1);
    }

    /// Record an outgoing item.
    #[inline]
    pub fn record_out(&self) {
        self.items_out.increment(1);
    }

    /// Record a discarded item.
    #[inline]
    pub fn record_dropped(&self) {
        self.items_dropped.increment(1);
    }

    /// Record how late a frame was presented.
    #[inline]
    pub fn record_present_lag(&self, lag: Duration) {
        self.present_lag.record(lag.as_nanos() as f64);
    }

    /// Get the pipeline name.
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Get the stage name.
    pub fn stage(&self) -> &str {
        &self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        init_metrics();
        // Should be idempotent
        init_metrics();
    }

    #[test]
    fn test_stage_metrics() {
        let metrics = StageMetrics::new("test-pipeline", "decode-0");

        metrics.record_in();
        metrics.record_out();
        metrics.record_dropped();
        metrics.record_present_lag(Duration::from_micros(50));

        assert_eq!(metrics.pipeline(), "test-pipeline");
        assert_eq!(metrics.stage(), "decode-0");
    }

    #[test]
    fn test_queue_depth_without_recorder() {
        record_queue_depth("video-packets", 5);
    }
}
