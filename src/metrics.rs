//! Prometheus metrics for scan monitoring.
//!
//! This module provides metrics for:
//! - Scan cycle count and duration
//! - Per-market extraction latency and failures
//! - Opportunity lifecycle events
//! - Notification delivery

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

use crate::notify::Channel;

// === Metric Name Constants ===

/// Extraction latency metric name.
pub const METRIC_EXTRACTION_LATENCY: &str = "extraction_latency_ms";
/// Scan cycle duration metric name.
pub const METRIC_CYCLE_DURATION: &str = "scan_cycle_duration_ms";
/// Completed scan cycles counter metric name.
pub const METRIC_SCAN_CYCLES: &str = "scan_cycles_total";
/// Markets scanned counter metric name.
pub const METRIC_MARKETS_SCANNED: &str = "markets_scanned_total";
/// Failed market scans counter metric name.
pub const METRIC_SCAN_FAILURES: &str = "market_scan_failures_total";
/// New opportunities counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Resolved opportunities counter metric name.
pub const METRIC_OPPORTUNITIES_RESOLVED: &str = "opportunities_resolved_total";
/// Open opportunities gauge metric name.
pub const METRIC_OPEN_OPPORTUNITIES: &str = "open_opportunities";
/// Delivered notifications counter metric name.
pub const METRIC_NOTIFICATIONS_SENT: &str = "notifications_sent_total";
/// Failed notifications counter metric name.
pub const METRIC_NOTIFICATIONS_FAILED: &str = "notifications_failed_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_EXTRACTION_LATENCY,
        "Page extraction latency in milliseconds"
    );
    describe_histogram!(
        METRIC_CYCLE_DURATION,
        "Full scan cycle duration in milliseconds"
    );

    describe_counter!(METRIC_SCAN_CYCLES, "Total number of scan cycles run");
    describe_counter!(METRIC_MARKETS_SCANNED, "Total number of market scans");
    describe_counter!(
        METRIC_SCAN_FAILURES,
        "Total number of market scans that failed"
    );
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total number of arbitrage opportunities opened"
    );
    describe_counter!(
        METRIC_OPPORTUNITIES_RESOLVED,
        "Total number of arbitrage opportunities closed"
    );
    describe_gauge!(
        METRIC_OPEN_OPPORTUNITIES,
        "Markets currently holding an arbitrage opportunity"
    );
    describe_counter!(
        METRIC_NOTIFICATIONS_SENT,
        "Total number of notifications delivered"
    );
    describe_counter!(
        METRIC_NOTIFICATIONS_FAILED,
        "Total number of notifications that failed to deliver"
    );

    debug!("Metrics initialized");
}

/// Install the Prometheus recorder and return the handle used to render it.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Record extraction latency for one market.
pub fn record_extraction_latency(start: Instant, market_id: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_EXTRACTION_LATENCY, "market" => market_id.to_string()).record(latency_ms);
}

/// Increment completed scan cycles.
pub fn inc_scan_cycles() {
    counter!(METRIC_SCAN_CYCLES).increment(1);
}

/// Increment markets scanned.
pub fn inc_markets_scanned() {
    counter!(METRIC_MARKETS_SCANNED).increment(1);
}

/// Increment failed scans, labelled with the failure kind.
pub fn inc_scan_failures(kind: &'static str) {
    counter!(METRIC_SCAN_FAILURES, "kind" => kind).increment(1);
}

/// Increment opened opportunities.
pub fn inc_opportunities_detected() {
    counter!(METRIC_OPPORTUNITIES_DETECTED).increment(1);
}

/// Increment closed opportunities.
pub fn inc_opportunities_resolved() {
    counter!(METRIC_OPPORTUNITIES_RESOLVED).increment(1);
}

/// Set the number of open opportunities.
pub fn set_open_opportunities(count: usize) {
    gauge!(METRIC_OPEN_OPPORTUNITIES).set(count as f64);
}

/// Increment delivered notifications.
pub fn inc_notifications_sent(channel: Channel) {
    counter!(METRIC_NOTIFICATIONS_SENT, "channel" => channel.to_string()).increment(1);
}

/// Increment failed notifications.
pub fn inc_notifications_failed(channel: Channel) {
    counter!(METRIC_NOTIFICATIONS_FAILED, "channel" => channel.to_string()).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for a scan cycle.
pub fn timer_cycle() -> LatencyTimer {
    LatencyTimer::new(METRIC_CYCLE_DURATION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn latency_timer_measures_time() {
        let timer = LatencyTimer::new("test_metric");
        sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 9.0);
    }

    #[test]
    fn recording_without_recorder_is_harmless() {
        inc_scan_cycles();
        inc_scan_failures("timeout");
        set_open_opportunities(2);
        inc_notifications_sent(Channel::Primary);
        record_extraction_latency(Instant::now(), "test-market");
    }
}
