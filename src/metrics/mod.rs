//! Prometheus metrics for the fan-out service.
//!
//! - Dispatch metrics (requests by outcome, batch size)
//! - Recipient metrics (outcomes and send latency per channel)
//! - Quota metrics (committed amounts, current usage and budget)

mod helpers;

pub use helpers::{encode_metrics, DispatchMetrics, QuotaMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, register_int_gauge_vec,
    Histogram, HistogramVec, IntCounterVec, IntGaugeVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "ara";

lazy_static! {
    // ============================================================================
    // Dispatch Metrics
    // ============================================================================

    /// Dispatch requests by outcome (ok, multi_status, rejected)
    pub static ref DISPATCH_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_dispatch_requests_total", METRIC_PREFIX),
        "Total dispatch requests by outcome",
        &["outcome"]
    ).unwrap();

    /// Recipients per dispatch request
    pub static ref DISPATCH_BATCH_SIZE: Histogram = register_histogram!(
        format!("{}_dispatch_batch_size", METRIC_PREFIX),
        "Number of recipients per dispatch request",
        vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 500.0]
    ).unwrap();

    // ============================================================================
    // Recipient Metrics
    // ============================================================================

    /// Recipient deliveries by channel and result
    pub static ref RECIPIENT_DELIVERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_recipient_deliveries_total", METRIC_PREFIX),
        "Total recipient delivery attempts by channel and result",
        &["channel", "result"]
    ).unwrap();

    /// Send latency per channel
    pub static ref RECIPIENT_SEND_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_recipient_send_latency_seconds", METRIC_PREFIX),
        "Channel send latency in seconds",
        &["channel"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    // ============================================================================
    // Quota Metrics
    // ============================================================================

    /// Amounts committed into the accountant per dimension
    pub static ref QUOTA_COMMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_quota_committed_total", METRIC_PREFIX),
        "Total quota committed per dimension",
        &["dimension"]
    ).unwrap();

    /// Current cumulative usage per dimension
    pub static ref QUOTA_USAGE: IntGaugeVec = register_int_gauge_vec!(
        format!("{}_quota_usage", METRIC_PREFIX),
        "Current cumulative quota usage per dimension",
        &["dimension"]
    ).unwrap();

    /// Configured budget per capped dimension
    pub static ref QUOTA_BUDGET: IntGaugeVec = register_int_gauge_vec!(
        format!("{}_quota_budget", METRIC_PREFIX),
        "Configured quota budget per dimension (absent when uncapped)",
        &["dimension"]
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        DISPATCH_REQUESTS_TOTAL.with_label_values(&["ok"]).inc();
        let output = encode_metrics().unwrap();
        assert!(output.contains("ara_dispatch_requests_total"));
    }
}
