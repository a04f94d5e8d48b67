//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{health, metrics, opportunities, ready, status, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Monitor endpoints
        .route("/api/v1/status", get(status))
        .route("/api/v1/opportunities", get(opportunities))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::{compute_arbitrage, OpportunityTracker, TrackerPolicy};
    use crate::market::Outcome;
    use crate::scanner::CycleSummary;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use time::OffsetDateTime;
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    fn empty_state() -> AppState {
        AppState::new(
            OpportunityTracker::shared(TrackerPolicy::default()),
            Arc::new(RwLock::new(None)),
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = create_router(empty_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_503_before_first_cycle() {
        let (status, body) = get_json(create_router(empty_state()), "/ready").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["ready"], false);
    }

    #[tokio::test]
    async fn ready_and_status_after_cycle() {
        let state = empty_state();
        *state.last_cycle.write().await = Some(CycleSummary {
            scanned: 3,
            succeeded: 2,
            opportunities: Vec::new(),
            errors: 1,
            interrupted: false,
            duration_ms: 12,
            finished_at: OffsetDateTime::now_utc(),
        });

        let (status, _) = get_json(create_router(state.clone()), "/ready").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get_json(create_router(state), "/api/v1/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");
        assert_eq!(body["last_cycle"]["errors"], 1);
    }

    #[tokio::test]
    async fn opportunities_filters_unless_all() {
        let state = empty_state();
        {
            let mut tracker = state.tracker.write().await;
            let open = vec![Outcome::new("Yes", dec!(45.2)), Outcome::new("No", dec!(50))];
            let closed = vec![Outcome::new("Yes", dec!(45.2)), Outcome::new("No", dec!(56.8))];
            tracker.record_scan("open", Ok(compute_arbitrage("open", &open).unwrap()));
            tracker.record_scan("closed", Ok(compute_arbitrage("closed", &closed).unwrap()));
        }

        let (_, body) = get_json(create_router(state.clone()), "/api/v1/opportunities").await;
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["market_id"], "open");
        assert_eq!(list[0]["status"], "opportunity");
        assert!(list[0]["margin_pct"].as_str().unwrap().starts_with("5.04"));

        let (_, body) = get_json(create_router(state), "/api/v1/opportunities?all=true").await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_not_found() {
        let response = create_router(empty_state())
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
