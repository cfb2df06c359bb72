// Metrics module - Prometheus counters and histograms
//
// All metrics live in the default prometheus registry and are registered once
// through a process-wide singleton.

use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, HistogramTimer,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Process-wide metrics for request handling and the render cache
pub struct StampMetrics {
    /// Requests by outcome (cache_hit, generated, not_found, failed, ...)
    requests: IntCounterVec,

    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub cache_writes: IntCounter,
    pub cache_write_errors: IntCounter,

    /// Time spent rendering an image on a cache miss (seconds)
    pub render_duration: Histogram,
}

static METRICS: OnceLock<StampMetrics> = OnceLock::new();

impl StampMetrics {
    /// Initialize and return the global metrics instance
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let requests = register_int_counter_vec!(
                "imagestamp_requests_total",
                "Total number of requests by outcome",
                &["outcome"]
            )
            .expect("Failed to register requests_total metric");

            let cache_ops = register_int_counter_vec!(
                "imagestamp_cache_operations_total",
                "Total number of render cache operations by type",
                &["operation"] // hit, miss, write, write_error
            )
            .expect("Failed to register cache_operations_total metric");

            let render_duration = register_histogram!(
                "imagestamp_render_duration_seconds",
                "Duration of image rendering in seconds",
                vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
            )
            .expect("Failed to register render_duration_seconds metric");

            StampMetrics {
                requests,
                cache_hits: cache_ops.with_label_values(&["hit"]),
                cache_misses: cache_ops.with_label_values(&["miss"]),
                cache_writes: cache_ops.with_label_values(&["write"]),
                cache_write_errors: cache_ops.with_label_values(&["write_error"]),
                render_duration,
            }
        })
    }

    pub fn record_request(&self, outcome: &str) {
        self.requests.with_label_values(&[outcome]).inc();
    }

    pub fn request_count(&self, outcome: &str) -> u64 {
        self.requests.with_label_values(&[outcome]).get()
    }

    /// Start timing a render; the duration is observed when the timer drops.
    pub fn start_render_timer(&self) -> HistogramTimer {
        self.render_duration.start_timer()
    }
}

/// Render every registered metric in the Prometheus text format.
pub fn export() -> Result<String, String> {
    // Touch the singleton so the families exist even before the first request
    StampMetrics::global();

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| e.to_string())?;
    String::from_utf8(buffer).map_err(|e| e.to_string())
}
