//! HTTP API: router assembly and shared state
//!
//! Probes and metrics are served unauthenticated; everything else sits
//! behind the authorization gate.

use crate::handlers::{containers, images, networks};
use agent_lib::{
    auth::{panel_auth, Gate},
    health::{ComponentStatus, HealthRegistry},
    observability::AgentMetrics,
    runtime::RuntimeBackend,
    stats::SampleCache,
};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Shared application state
pub struct AppState {
    pub backend: Arc<dyn RuntimeBackend>,
    pub cache: SampleCache,
    pub metrics: AgentMetrics,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn RuntimeBackend>,
        metrics: AgentMetrics,
        health_registry: HealthRegistry,
    ) -> Self {
        Self {
            backend,
            cache: SampleCache::new(),
            metrics,
            health_registry,
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, gate: Arc<Gate>) -> Router {
    let protected = Router::new()
        .route("/container/list", get(containers::list))
        .route("/container/create", post(containers::create))
        .route("/container/start", post(containers::start))
        .route("/container/stop", post(containers::stop))
        .route("/container/kill", post(containers::kill))
        .route("/container/delete", post(containers::delete))
        .route("/container/get_by_id", post(containers::get_by_id))
        .route("/container/get_by_name", post(containers::get_by_name))
        .route("/container/stats_by_name", post(containers::stats_by_name))
        .route("/network/create", post(networks::create))
        .route("/network/list", get(networks::list))
        .route("/network/delete", post(networks::delete))
        .route("/image/list", get(images::list))
        .route("/image/delete", post(images::delete))
        .layer(middleware::from_fn_with_state(gate, panel_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .merge(protected)
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>, gate: Arc<Gate>) -> anyhow::Result<()> {
    let app = create_router(state, gate);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
