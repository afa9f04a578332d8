//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use crate::dispatch::DispatchStatus;
use crate::quota::{QuotaDimension, QuotaSnapshot};

use super::{
    DISPATCH_BATCH_SIZE, DISPATCH_REQUESTS_TOTAL, QUOTA_BUDGET, QUOTA_COMMITTED_TOTAL,
    QUOTA_USAGE, RECIPIENT_DELIVERIES_TOTAL, RECIPIENT_SEND_LATENCY,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording dispatch metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record the overall outcome of a dispatch
    pub fn record_outcome(status: DispatchStatus) {
        DISPATCH_REQUESTS_TOTAL
            .with_label_values(&[status.as_str()])
            .inc();
    }

    /// Record the number of recipients in a dispatch
    pub fn record_batch_size(recipients: usize) {
        DISPATCH_BATCH_SIZE.observe(recipients as f64);
    }

    /// Record one recipient's delivery result
    pub fn record_recipient(channel: &str, ok: bool) {
        let result = if ok { "ok" } else { "failed" };
        RECIPIENT_DELIVERIES_TOTAL
            .with_label_values(&[channel, result])
            .inc();
    }

    /// Record how long one channel send took
    pub fn observe_send_latency(channel: &str, latency_secs: f64) {
        RECIPIENT_SEND_LATENCY
            .with_label_values(&[channel])
            .observe(latency_secs);
    }
}

/// Helper struct for quota metrics
pub struct QuotaMetrics;

impl QuotaMetrics {
    /// Record an amount committed into the accountant
    pub fn record_committed(dimension: QuotaDimension, amount: u64) {
        QUOTA_COMMITTED_TOTAL
            .with_label_values(&[dimension.as_str()])
            .inc_by(amount);
    }

    /// Refresh usage and budget gauges from a snapshot
    pub fn update_from_snapshot(snapshot: &QuotaSnapshot) {
        for dimension in QuotaDimension::ALL {
            QUOTA_USAGE
                .with_label_values(&[dimension.as_str()])
                .set(gauge_value(snapshot.usage.get(dimension)));
            if let Some(limit) = snapshot.budget.limit(dimension) {
                QUOTA_BUDGET
                    .with_label_values(&[dimension.as_str()])
                    .set(gauge_value(limit));
            }
        }
    }
}

/// Integer gauges are signed; clamp instead of wrapping
fn gauge_value(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::{QuotaAccountant, QuotaBudget, QuotaConfig, QuotaPolicy, QuotaUsage};

    #[test]
    fn test_dispatch_metrics() {
        DispatchMetrics::record_outcome(DispatchStatus::Ok);
        DispatchMetrics::record_outcome(DispatchStatus::QuotaExceeded);
        DispatchMetrics::record_batch_size(3);
        DispatchMetrics::record_recipient("webhook", true);
        DispatchMetrics::record_recipient("webhook", false);
        DispatchMetrics::observe_send_latency("webhook", 0.02);
        // Just verify no panics
    }

    #[test]
    fn test_quota_metrics() {
        QuotaMetrics::record_committed(QuotaDimension::Messages, 3);
        let accountant = QuotaAccountant::new(QuotaConfig::default());
        QuotaMetrics::update_from_snapshot(&accountant.snapshot());
        // Just verify no panics
    }

    #[test]
    fn test_gauge_value_saturates() {
        assert_eq!(gauge_value(42), 42);
        assert_eq!(gauge_value(i64::MAX as u64), i64::MAX);
        assert_eq!(gauge_value(u64::MAX), i64::MAX);
    }

    #[test]
    fn test_huge_budget_does_not_wrap() {
        let snapshot = QuotaSnapshot {
            policy: QuotaPolicy::Soft,
            usage: QuotaUsage::default(),
            reserved: QuotaUsage::default(),
            budget: QuotaBudget::default().with_limit(QuotaDimension::Webhook, u64::MAX),
        };
        QuotaMetrics::update_from_snapshot(&snapshot);
        assert_eq!(
            QUOTA_BUDGET.with_label_values(&["webhook"]).get(),
            i64::MAX
        );
    }
}
