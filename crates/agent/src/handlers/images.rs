//! Image endpoints

use super::ApiError;
use crate::api::AppState;
use axum::{extract::State, Json};
use bollard::models::ImageSummary;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct DeleteImageRequest {
    /// Image reference (name:tag or digest) to remove.
    #[serde(default)]
    pub registry: String,
}

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ImageSummary>>, ApiError> {
    let images = state.backend.list_images().await?;
    Ok(Json(images))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteImageRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.registry.is_empty() {
        return Err(ApiError::bad_request("Missing or invalid registry"));
    }
    state.backend.remove_image(&req.registry).await?;
    Ok(Json(json!({ "message": "Image deleted" })))
}
