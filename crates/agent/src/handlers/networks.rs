//! Network endpoints

use super::{ActionRequest, ApiError};
use crate::api::AppState;
use agent_lib::runtime::CreateNetworkSpec;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(spec): Json<CreateNetworkSpec>,
) -> Result<impl IntoResponse, ApiError> {
    if spec.name.is_empty() {
        return Err(ApiError::bad_request("Missing network name"));
    }
    let created = state.backend.create_network(spec).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": created.id }))))
}

pub async fn list(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let networks = state.backend.list_networks().await?;
    Ok(Json(json!({ "networks": networks })))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.id.is_empty() {
        return Err(ApiError::bad_request("Missing or invalid network id"));
    }
    state.backend.remove_network(&req.id).await?;
    Ok(Json(json!({ "message": "Network deleted" })))
}
