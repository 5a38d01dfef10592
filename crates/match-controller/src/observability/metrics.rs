//! Metrics definitions for the matchmaking core.
//!
//! All metrics follow Prometheus naming conventions:
//! - `mm_` prefix for the matchmaking core
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `reason`: bounded relay-rejection reasons (3 values)
//!
//! Queue sizes are exported as a single aggregate gauge, never per queue
//! key (the key space is user-driven and unbounded).

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus metrics recorder and return the handle for
/// serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns an error if the recorder fails to install (e.g., already
/// installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Matching-cycle duration buckets - multi-round pairing over
        // potentially hundreds of polled members
        .set_buckets_for_metric(
            Matcher::Prefix("mm_cycle".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500,
            ],
        )
        .map_err(|e| format!("Failed to set cycle buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

/// Count an accepted enqueue.
///
/// Metric: `mm_enqueue_total`
pub fn increment_enqueue() {
    counter!("mm_enqueue_total").increment(1);
}

/// Count finalized matches (pairs, not participants).
///
/// Metric: `mm_matches_total`
pub fn increment_matches(pairs: u64) {
    counter!("mm_matches_total").increment(pairs);
}

/// Count leftover singles returned to the queue after a cycle.
///
/// Metric: `mm_requeued_total`
pub fn increment_requeued(count: u64) {
    counter!("mm_requeued_total").increment(count);
}

/// Count signaling relays dropped before delivery.
///
/// Metric: `mm_relay_rejected_total`
/// Labels: `reason` ∈ {no_session, no_partner, receiver_mismatch}
pub fn increment_relay_rejected(reason: &'static str) {
    counter!("mm_relay_rejected_total", "reason" => reason).increment(1);
}

/// Count cycle executions that aborted on an error.
///
/// Metric: `mm_cycle_errors_total`
pub fn increment_cycle_errors() {
    counter!("mm_cycle_errors_total").increment(1);
}

/// Record one matching cycle's duration.
///
/// Metric: `mm_cycle_duration_seconds`
pub fn record_cycle_duration(duration: Duration) {
    histogram!("mm_cycle_duration_seconds").record(duration.as_secs_f64());
}

/// Set the total number of waiting members observed at poll time.
///
/// Metric: `mm_queue_waiting`
pub fn set_queue_waiting(count: u64) {
    // u64 to f64 conversion is safe for realistic queue sizes (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    gauge!("mm_queue_waiting").set(count as f64);
}
