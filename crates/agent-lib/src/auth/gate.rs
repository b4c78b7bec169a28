//! Request authorization gate
//!
//! Every protected route passes through [`panel_auth`] before reaching its
//! handler. The gate checks two independent predicates in a fixed order:
//! bearer-token equality first, then client-address admission. The two
//! failures stay distinguishable (401 vs 403) so operators can tell a
//! credential problem from a connectivity one.

use crate::auth::policy::PolicyStore;
use crate::auth::secret::PanelSecret;
use crate::observability::AgentMetrics;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Shared state for the authorization middleware.
pub struct Gate {
    secret: PanelSecret,
    policy: Arc<PolicyStore>,
    metrics: AgentMetrics,
}

impl Gate {
    pub fn new(secret: PanelSecret, policy: Arc<PolicyStore>, metrics: AgentMetrics) -> Self {
        Self {
            secret,
            policy,
            metrics,
        }
    }
}

/// Middleware admitting or rejecting each inbound call.
///
/// On success the wrapped handler runs unchanged; the gate never touches
/// the response on the admit path.
pub async fn panel_auth(
    State(gate): State<Arc<Gate>>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !gate.secret.matches_header(presented) {
        gate.metrics.inc_unauthorized();
        debug!("rejected request with bad bearer token");
        return reject(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let addr = client_addr(request.headers(), peer).unwrap_or_default();

    if !gate.policy.current().allows(&addr) {
        gate.metrics.inc_forbidden();
        debug!(client_addr = %addr, "rejected request from disallowed address");
        return reject(StatusCode::FORBIDDEN, "Forbidden");
    }

    next.run(request).await
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Derive the caller's network address.
///
/// Precedence is security-relevant and mirrors what a reverse proxy in
/// front of the agent sets: first entry of `X-Forwarded-For`, then
/// `X-Real-IP`, then the transport peer address.
pub fn client_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = xff.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return Some(real_ip.to_string());
        }
    }
    peer.map(|addr| addr.ip().to_string())
}
