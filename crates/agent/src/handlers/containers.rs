//! Container endpoints
//!
//! All pass straight through to the runtime backend except
//! `stats_by_name`, which folds a fresh one-shot counter snapshot against
//! the cached previous sample to produce instantaneous rates.

use super::{ActionRequest, ApiError, NameRequest};
use crate::api::AppState;
use agent_lib::models::ContainerStatsReport;
use agent_lib::runtime::CreateContainerSpec;
use agent_lib::stats::{cpu_limit_percent, cpu_percent, mem_mb, resolve_cores};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use bollard::models::{ContainerInspectResponse, ContainerSummary};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ContainerSummary>>, ApiError> {
    let containers = state.backend.list_containers().await?;
    Ok(Json(containers))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(spec): Json<CreateContainerSpec>,
) -> Result<impl IntoResponse, ApiError> {
    if spec.name.is_empty() || spec.image.is_empty() {
        return Err(ApiError::bad_request("Missing container name or image"));
    }
    let created = state.backend.create_container(spec).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": created.id }))))
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = require_id(&req)?;
    state.backend.start_container(id).await?;
    Ok(Json(json!({ "message": "Container started" })))
}

pub async fn stop(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = require_id(&req)?;
    state.backend.stop_container(id).await?;
    Ok(Json(json!({ "message": "Container stopped" })))
}

pub async fn kill(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = require_id(&req)?;
    state.backend.kill_container(id).await?;
    Ok(Json(json!({ "message": "Container killed" })))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = require_id(&req)?;
    state.backend.remove_container(id).await?;
    Ok(Json(json!({ "message": "Container deleted" })))
}

pub async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<ContainerInspectResponse>, ApiError> {
    let id = require_id(&req)?;
    let inspected = state.backend.inspect_container(id).await?;
    Ok(Json(inspected))
}

pub async fn get_by_name(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NameRequest>,
) -> Result<Json<ContainerSummary>, ApiError> {
    let name = require_name(&req)?;
    let container = state
        .backend
        .find_container_by_name(name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No container named {name}")))?;
    Ok(Json(container))
}

/// One-shot stats for a container, addressed by name.
pub async fn stats_by_name(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NameRequest>,
) -> Result<Json<ContainerStatsReport>, ApiError> {
    let name = require_name(&req)?;
    let started = Instant::now();

    let container = state
        .backend
        .find_container_by_name(name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No container named {name}")))?;
    let id = container
        .id
        .ok_or_else(|| ApiError::not_found(format!("Container {name} has no id")))?;

    let snapshot = state.backend.one_shot_stats(&id).await?;
    let limit = state.backend.cpu_limit(&id).await?;

    let cores = resolve_cores(snapshot.percpu_count);
    let current = snapshot.into_sample(id);
    // Swap in the fresh sample and get the previous one back in a single
    // critical section, keyed by container id.
    let previous = state.cache.replace(current.clone());

    let report = ContainerStatsReport {
        cpu_percent: cpu_percent(&current, previous.as_ref(), cores),
        cpu_limit_percent: cpu_limit_percent(&limit, cores),
        mem_usage_mb: mem_mb(current.memory_usage_bytes),
        mem_limit_mb: mem_mb(current.memory_limit_bytes),
        network_rx_bytes: current.network_rx_bytes,
        network_tx_bytes: current.network_tx_bytes,
        host_cpus: cores,
    };

    state
        .metrics
        .observe_stats_latency(started.elapsed().as_secs_f64());

    Ok(Json(report))
}

fn require_id(req: &ActionRequest) -> Result<&str, ApiError> {
    if req.id.is_empty() {
        Err(ApiError::bad_request("Missing or invalid container id"))
    } else {
        Ok(&req.id)
    }
}

fn require_name(req: &NameRequest) -> Result<&str, ApiError> {
    if req.name.is_empty() {
        Err(ApiError::bad_request("Missing or invalid container name"))
    } else {
        Ok(&req.name)
    }
}
