//! Per-market opportunity lifecycle across scan cycles.
//!
//! Each market moves through `Unknown -> NoOpportunity <-> Opportunity`.
//! The tracker turns those transitions into notifiable events and keeps the
//! latest result for the interactive session. Failed scans never erase known
//! state.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use strum::Display;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;

use super::calculator::ArbitrageResult;
use crate::error::ScanError;

/// Tracker shared between the scan loop (sole writer) and readers.
pub type SharedTracker = Arc<RwLock<OpportunityTracker>>;

/// Detection policy applied to every recorded scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerPolicy {
    /// Margin (percent) that must be exceeded to count as an opportunity.
    pub threshold: Decimal,
    /// Minimum margin change (percentage points) that re-notifies an open opportunity.
    pub epsilon: Decimal,
}

impl Default for TrackerPolicy {
    fn default() -> Self {
        Self {
            threshold: Decimal::ZERO,
            epsilon: Decimal::new(1, 2),
        }
    }
}

/// Opportunity status of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    /// No successful scan yet.
    #[strum(serialize = "unknown")]
    Unknown,
    /// Latest margin is at or below the threshold.
    #[strum(serialize = "no opportunity")]
    NoOpportunity,
    /// Latest margin exceeds the threshold.
    #[strum(serialize = "opportunity")]
    Opportunity,
}

/// Tracked state for one market.
#[derive(Debug, Clone)]
pub struct OpportunityState {
    /// Market identifier.
    pub market_id: String,
    /// Current status.
    pub status: OpportunityStatus,
    /// Most recent successful result.
    pub latest: Option<ArbitrageResult>,
    /// Margin from the successful scan before the latest one.
    pub previous_margin: Option<Decimal>,
    /// Error from the most recent failed scan, cleared on success.
    pub last_error: Option<String>,
    /// Failed scans since the last success.
    pub consecutive_failures: u32,
    /// Time of the most recent scan attempt.
    pub last_checked: Option<OffsetDateTime>,
}

impl OpportunityState {
    fn new(market_id: &str) -> Self {
        Self {
            market_id: market_id.to_string(),
            status: OpportunityStatus::Unknown,
            latest: None,
            previous_margin: None,
            last_error: None,
            consecutive_failures: 0,
            last_checked: None,
        }
    }

    /// Latest margin, if any scan succeeded.
    pub fn margin(&self) -> Option<Decimal> {
        self.latest.as_ref().map(|r| r.margin_pct)
    }

    /// Whether the market currently holds an opportunity.
    pub fn is_opportunity(&self) -> bool {
        self.status == OpportunityStatus::Opportunity
    }
}

/// Notifiable state transition.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// Market entered the opportunity state.
    NewOpportunity {
        /// The result that opened the opportunity.
        result: ArbitrageResult,
    },
    /// Open opportunity's margin moved by at least the policy epsilon.
    UpdatedOpportunity {
        /// Margin before this scan.
        previous_margin: Decimal,
        /// The new result.
        result: ArbitrageResult,
    },
    /// Opportunity disappeared.
    Resolved {
        /// Last margin that was an opportunity.
        previous_margin: Decimal,
        /// The result that closed it.
        result: ArbitrageResult,
    },
}

impl TrackerEvent {
    /// Market the event belongs to.
    pub fn market_id(&self) -> &str {
        &self.result().market_id
    }

    /// Result that triggered the event.
    pub fn result(&self) -> &ArbitrageResult {
        match self {
            TrackerEvent::NewOpportunity { result }
            | TrackerEvent::UpdatedOpportunity { result, .. }
            | TrackerEvent::Resolved { result, .. } => result,
        }
    }
}

/// Current known opportunity per monitored market.
#[derive(Debug, Default)]
pub struct OpportunityTracker {
    policy: TrackerPolicy,
    states: BTreeMap<String, OpportunityState>,
}

impl OpportunityTracker {
    /// Create a tracker with the given policy.
    pub fn new(policy: TrackerPolicy) -> Self {
        Self {
            policy,
            states: BTreeMap::new(),
        }
    }

    /// Create a tracker ready to share across tasks.
    pub fn shared(policy: TrackerPolicy) -> SharedTracker {
        Arc::new(RwLock::new(Self::new(policy)))
    }

    /// Policy in effect.
    pub fn policy(&self) -> TrackerPolicy {
        self.policy
    }

    /// Record one scan of a market and return the transition it caused.
    pub fn record_scan(
        &mut self,
        market_id: &str,
        scan: Result<ArbitrageResult, &ScanError>,
    ) -> Option<TrackerEvent> {
        let policy = self.policy;
        let state = self
            .states
            .entry(market_id.to_string())
            .or_insert_with(|| OpportunityState::new(market_id));
        state.last_checked = Some(OffsetDateTime::now_utc());

        let result = match scan {
            Ok(result) => result,
            Err(err) => {
                state.last_error = Some(err.to_string());
                state.consecutive_failures += 1;
                debug!(
                    market = %market_id,
                    failures = state.consecutive_failures,
                    "Scan failed, keeping previous state"
                );
                return None;
            }
        };

        let previous_status = state.status;
        let previous_margin = state.margin();
        let status = if result.is_opportunity(policy.threshold) {
            OpportunityStatus::Opportunity
        } else {
            OpportunityStatus::NoOpportunity
        };

        state.previous_margin = previous_margin;
        state.latest = Some(result.clone());
        state.status = status;
        state.last_error = None;
        state.consecutive_failures = 0;

        use OpportunityStatus::*;
        match (previous_status, status, previous_margin) {
            (Unknown | NoOpportunity, Opportunity, _) => {
                Some(TrackerEvent::NewOpportunity { result })
            }
            (Opportunity, Opportunity, Some(prev))
                if (result.margin_pct - prev).abs() >= policy.epsilon =>
            {
                Some(TrackerEvent::UpdatedOpportunity {
                    previous_margin: prev,
                    result,
                })
            }
            (Opportunity, NoOpportunity, Some(prev)) => Some(TrackerEvent::Resolved {
                previous_margin: prev,
                result,
            }),
            _ => None,
        }
    }

    /// All tracked states, ordered by market id.
    pub fn snapshot(&self) -> Vec<OpportunityState> {
        self.states.values().cloned().collect()
    }

    /// Tracked states currently holding an opportunity.
    pub fn opportunities(&self) -> Vec<OpportunityState> {
        self.states
            .values()
            .filter(|s| s.is_opportunity())
            .cloned()
            .collect()
    }

    /// State of one market.
    pub fn get(&self, market_id: &str) -> Option<&OpportunityState> {
        self.states.get(market_id)
    }

    /// Number of tracked markets.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no market has been recorded.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
