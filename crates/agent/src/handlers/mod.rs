//! Request handlers: thin JSON glue around the runtime backend.

pub mod containers;
pub mod images;
pub mod networks;

use agent_lib::observability::AgentMetrics;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

/// Request carrying only a resource id.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub id: String,
}

/// Request carrying only a resource name.
#[derive(Debug, Deserialize)]
pub struct NameRequest {
    #[serde(default)]
    pub name: String,
}

/// Uniform JSON error for handler failures.
///
/// Authorization failures never reach here; the gate rejects before the
/// handler runs.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Backend(anyhow::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Backend(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Backend(err) => {
                error!(error = %err, "runtime backend call failed");
                AgentMetrics::new().inc_backend_errors();
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
