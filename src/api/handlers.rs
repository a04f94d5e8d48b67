//! HTTP API handlers.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::arbitrage::{OpportunityState, OpportunityStatus, SharedTracker};
use crate::scanner::{CycleSummary, LastCycle};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Opportunity tracker (read-only here).
    pub tracker: SharedTracker,
    /// Most recent completed cycle.
    pub last_cycle: LastCycle,
    /// Prometheus render handle, when a recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
    /// Process start, for uptime.
    pub started_at: Instant,
}

impl AppState {
    /// Create new app state.
    pub fn new(tracker: SharedTracker, last_cycle: LastCycle) -> Self {
        Self {
            tracker,
            last_cycle,
            prometheus: None,
            started_at: Instant::now(),
        }
    }

    /// Attach the Prometheus handle served on `/metrics`.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Ready once the first scan cycle has completed.
    pub async fn is_ready(&self) -> bool {
        self.last_cycle.read().await.is_some()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether a scan cycle has completed.
    pub ready: bool,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Seconds since start.
    pub uptime_secs: u64,
    /// Markets with at least one recorded scan.
    pub markets_tracked: usize,
    /// Markets currently holding an opportunity.
    pub open_opportunities: usize,
    /// Most recent completed cycle.
    pub last_cycle: Option<CycleSummary>,
}

/// One tracked market in the opportunities response.
#[derive(Debug, Serialize)]
pub struct MarketView {
    /// Market identifier.
    pub market_id: String,
    /// Opportunity status.
    pub status: OpportunityStatus,
    /// Latest margin in percent.
    pub margin_pct: Option<Decimal>,
    /// Latest arbitrage constant.
    pub arbitrage_constant: Option<Decimal>,
    /// Latest prices, in outcome order.
    pub prices: Vec<Decimal>,
    /// Latest odds, in outcome order.
    pub odds: Vec<Decimal>,
    /// Margin before the latest scan.
    pub previous_margin: Option<Decimal>,
    /// Error from the last failed scan.
    pub last_error: Option<String>,
    /// Failed scans since the last success.
    pub consecutive_failures: u32,
    /// Time of the last scan attempt.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_checked: Option<OffsetDateTime>,
}

impl From<OpportunityState> for MarketView {
    fn from(state: OpportunityState) -> Self {
        let latest = state.latest.as_ref();
        Self {
            margin_pct: latest.map(|r| r.margin_pct.round_dp(4)),
            arbitrage_constant: latest.map(|r| r.arbitrage_constant),
            prices: latest.map(|r| r.prices()).unwrap_or_default(),
            odds: latest
                .map(|r| r.odds().into_iter().map(|o| o.round_dp(4)).collect())
                .unwrap_or_default(),
            previous_margin: state.previous_margin.map(|m| m.round_dp(4)),
            market_id: state.market_id,
            status: state.status,
            last_error: state.last_error,
            consecutive_failures: state.consecutive_failures,
            last_checked: state.last_checked,
        }
    }
}

/// Query for the opportunities endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct OpportunitiesQuery {
    /// Include markets without an opportunity.
    #[serde(default)]
    pub all: bool,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 after the first cycle, 503 before.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready().await;
    let response = ReadyResponse { ready: is_ready };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns monitor status and the last cycle summary.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let last_cycle = state.last_cycle.read().await.clone();
    let (markets_tracked, open_opportunities) = {
        let tracker = state.tracker.read().await;
        (tracker.len(), tracker.opportunities().len())
    };

    let status = if last_cycle.is_some() { "running" } else { "starting" };

    Json(StatusResponse {
        status,
        uptime_secs: state.started_at.elapsed().as_secs(),
        markets_tracked,
        open_opportunities,
        last_cycle,
    })
}

/// Opportunities handler - returns the tracker snapshot.
pub async fn opportunities(
    State(state): State<AppState>,
    Query(query): Query<OpportunitiesQuery>,
) -> impl IntoResponse {
    let states = {
        let tracker = state.tracker.read().await;
        if query.all {
            tracker.snapshot()
        } else {
            tracker.opportunities()
        }
    };

    Json(states.into_iter().map(MarketView::from).collect::<Vec<_>>())
}

/// Prometheus metrics handler.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            "metrics recorder not installed\n".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::{OpportunityTracker, TrackerPolicy};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[tokio::test]
    async fn app_state_ready_after_first_cycle() {
        let state = AppState::new(
            OpportunityTracker::shared(TrackerPolicy::default()),
            Arc::new(RwLock::new(None)),
        );
        assert!(!state.is_ready().await);

        *state.last_cycle.write().await = Some(CycleSummary {
            scanned: 1,
            succeeded: 1,
            opportunities: Vec::new(),
            errors: 0,
            interrupted: false,
            duration_ms: 5,
            finished_at: OffsetDateTime::now_utc(),
        });
        assert!(state.is_ready().await);
    }
}
