//! HTTP surface of the trigger gateway.
//!
//! Provides REST endpoints for:
//! - Manually triggering the danger state
//! - Querying the current state
//! - Operator reset
//! - Health checks

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use dropwatch_alert::{AlertState, TriggerGateway};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<TriggerGateway>,
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/danger", post(trigger_handler))
        .route("/danger-status", get(status_handler))
        .route("/danger/reset", post(reset_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `port` on all interfaces and serve until the process stops.
pub async fn run_server(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!(port, "Dropwatch trigger gateway listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TriggerResponse {
    /// Whether this request performed the Idle -> Active transition
    pub activated: bool,
    pub alert: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub danger_zone: bool,
    pub state: AlertState,
    pub activations: u64,
    pub dispatches: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub previous: AlertState,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

// ============================================================================
// Handlers
// ============================================================================

async fn trigger_handler(State(state): State<AppState>) -> Json<TriggerResponse> {
    let outcome = state.gateway.trigger();
    info!(activated = outcome.activated, "Manual trigger received");

    let alert = if outcome.activated {
        "Danger zone activated"
    } else {
        "Danger zone already active"
    };

    Json(TriggerResponse {
        activated: outcome.activated,
        alert: alert.to_string(),
    })
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.gateway.snapshot();
    Json(StatusResponse {
        danger_zone: snapshot.state.is_active(),
        state: snapshot.state,
        activations: snapshot.activations,
        dispatches: snapshot.dispatches,
    })
}

async fn reset_handler(State(state): State<AppState>) -> Json<ResetResponse> {
    Json(ResetResponse {
        previous: state.gateway.reset(),
    })
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use dropwatch_notify::{DispatchPool, FanOut, FanOutPlan, LogTransport};
    use serde::de::DeserializeOwned;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<TriggerGateway>) {
        let fan_out = FanOut::new(Arc::new(LogTransport), DispatchPool::new(2));
        let plan = FanOutPlan::new(Vec::new(), 1, Duration::ZERO);
        let gateway = Arc::new(TriggerGateway::new(fan_out, plan).unwrap());
        let router = build_router(AppState {
            gateway: Arc::clone(&gateway),
        });
        (router, gateway)
    }

    async fn send<T: DeserializeOwned>(router: &Router, method: &str, uri: &str) -> T {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_trigger_is_idempotent() {
        let (router, gateway) = app();

        let first: TriggerResponse = send(&router, "POST", "/danger").await;
        let second: TriggerResponse = send(&router, "POST", "/danger").await;

        assert!(first.activated);
        assert_eq!(first.alert, "Danger zone activated");
        assert!(!second.activated);
        assert_eq!(gateway.snapshot().dispatches, 1);
        gateway.drain().await;
    }

    #[tokio::test]
    async fn test_status_reflects_state() {
        let (router, gateway) = app();

        let idle: StatusResponse = send(&router, "GET", "/danger-status").await;
        assert!(!idle.danger_zone);
        assert_eq!(idle.state, AlertState::Idle);

        gateway.trigger();
        let active: StatusResponse = send(&router, "GET", "/danger-status").await;
        assert!(active.danger_zone);
        assert_eq!(active.state, AlertState::Active);
        assert_eq!(active.activations, 1);
        assert_eq!(active.dispatches, 1);
        gateway.drain().await;
    }

    #[tokio::test]
    async fn test_reset_returns_previous_state() {
        let (router, gateway) = app();

        let _: TriggerResponse = send(&router, "POST", "/danger").await;
        let reset: ResetResponse = send(&router, "POST", "/danger/reset").await;
        assert_eq!(reset.previous, AlertState::Active);

        let again: ResetResponse = send(&router, "POST", "/danger/reset").await;
        assert_eq!(again.previous, AlertState::Idle);

        let retrigger: TriggerResponse = send(&router, "POST", "/danger").await;
        assert!(retrigger.activated);
        assert_eq!(gateway.snapshot().dispatches, 2);
        gateway.drain().await;
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = app();
        let body: serde_json::Value = send(&router, "GET", "/health").await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_wrong_method_is_rejected() {
        let (router, _) = app();
        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/danger")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
