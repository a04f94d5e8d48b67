//! Scan cycle summary and report types.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::arbitrage::TrackerEvent;

/// Summary of the most recent completed cycle, shared with the status API.
pub type LastCycle = Arc<RwLock<Option<CycleSummary>>>;

/// One market that held an opportunity during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpportunityLine {
    /// Market identifier.
    pub market_id: String,
    /// Display label.
    pub label: String,
    /// Margin in percent.
    pub margin_pct: Decimal,
}

/// Aggregate outcome of one scan cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    /// Markets attempted this cycle.
    pub scanned: usize,
    /// Markets that produced a result.
    pub succeeded: usize,
    /// Markets whose margin beat the threshold this cycle.
    pub opportunities: Vec<OpportunityLine>,
    /// Markets that failed this cycle.
    pub errors: usize,
    /// Whether shutdown stopped the cycle before every market was scanned.
    pub interrupted: bool,
    /// Wall-clock duration of the cycle in milliseconds.
    pub duration_ms: u64,
    /// When the cycle finished.
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

/// A market that failed during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    /// Market identifier.
    pub market_id: String,
    /// Rendered error.
    pub error: String,
}

/// Everything a cycle produced.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Aggregate counts.
    pub summary: CycleSummary,
    /// Tracker transitions in market order.
    pub events: Vec<TrackerEvent>,
    /// Per-market failures in market order.
    pub failures: Vec<ScanFailure>,
}
