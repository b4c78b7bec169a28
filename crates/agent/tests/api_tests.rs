//! Integration tests for the authorization gate and the stats flow

use agent_lib::{
    auth::{panel_auth, Gate, PanelSecret, PolicyStore},
    models::{CounterSnapshot, ContainerStatsReport, CpuLimit},
    observability::AgentMetrics,
    runtime::{async_trait, CreateContainerSpec, CreateNetworkSpec, RuntimeBackend},
    stats::{cpu_limit_percent, cpu_percent, mem_mb, resolve_cores, SampleCache},
};
use anyhow::Result;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use bollard::models::{
    ContainerCreateResponse, ContainerInspectResponse, ContainerSummary, ImageSummary, Network,
    NetworkCreateResponse,
};
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Backend stub: one container, scripted counter snapshots.
struct StubBackend {
    snapshots: Mutex<Vec<CounterSnapshot>>,
}

impl StubBackend {
    fn with_snapshots(snapshots: Vec<CounterSnapshot>) -> Self {
        Self {
            snapshots: Mutex::new(snapshots),
        }
    }
}

#[async_trait]
impl RuntimeBackend for StubBackend {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        Ok(vec![ContainerSummary {
            id: Some("abc123".to_string()),
            names: Some(vec!["/web01".to_string()]),
            ..Default::default()
        }])
    }

    async fn create_container(&self, _spec: CreateContainerSpec) -> Result<ContainerCreateResponse> {
        Ok(ContainerCreateResponse {
            id: "abc123".to_string(),
            warnings: vec![],
        })
    }

    async fn start_container(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn stop_container(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn kill_container(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn remove_container(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn inspect_container(&self, _id: &str) -> Result<ContainerInspectResponse> {
        Ok(ContainerInspectResponse::default())
    }

    async fn find_container_by_name(&self, name: &str) -> Result<Option<ContainerSummary>> {
        if name == "web01" {
            Ok(Some(ContainerSummary {
                id: Some("abc123".to_string()),
                names: Some(vec!["/web01".to_string()]),
                ..Default::default()
            }))
        } else {
            Ok(None)
        }
    }

    async fn cpu_limit(&self, _id: &str) -> Result<CpuLimit> {
        Ok(CpuLimit {
            nano_cpus: None,
            quota: Some(50_000),
            period: Some(100_000),
        })
    }

    async fn one_shot_stats(&self, _id: &str) -> Result<CounterSnapshot> {
        let mut snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots.remove(0))
    }

    async fn create_network(&self, _spec: CreateNetworkSpec) -> Result<NetworkCreateResponse> {
        Ok(NetworkCreateResponse::default())
    }

    async fn list_networks(&self) -> Result<Vec<Network>> {
        Ok(vec![])
    }

    async fn remove_network(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>> {
        Ok(vec![])
    }

    async fn remove_image(&self, _reference: &str) -> Result<()> {
        Ok(())
    }
}

fn snapshot(secs: i64, cpu: u64, system: u64) -> CounterSnapshot {
    CounterSnapshot {
        cpu_total_ns: cpu,
        system_total_ns: system,
        percpu_count: 4,
        memory_usage_bytes: 104_857_600,
        memory_limit_bytes: 1_073_741_824,
        network_rx_bytes: 2048,
        network_tx_bytes: 1024,
        observed_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
    }
}

struct TestState {
    backend: Arc<dyn RuntimeBackend>,
    cache: SampleCache,
}

async fn list_handler(State(state): State<Arc<TestState>>) -> Json<Vec<ContainerSummary>> {
    Json(state.backend.list_containers().await.unwrap())
}

/// Mirrors the agent's stats_by_name handler: snapshot, swap against the
/// cache, compute rates.
async fn stats_handler(
    State(state): State<Arc<TestState>>,
    Json(req): Json<serde_json::Value>,
) -> Json<ContainerStatsReport> {
    let name = req["name"].as_str().unwrap();
    let container = state
        .backend
        .find_container_by_name(name)
        .await
        .unwrap()
        .unwrap();
    let id = container.id.unwrap();

    let snapshot = state.backend.one_shot_stats(&id).await.unwrap();
    let limit = state.backend.cpu_limit(&id).await.unwrap();
    let cores = resolve_cores(snapshot.percpu_count);
    let current = snapshot.into_sample(id);
    let previous = state.cache.replace(current.clone());

    Json(ContainerStatsReport {
        cpu_percent: cpu_percent(&current, previous.as_ref(), cores),
        cpu_limit_percent: cpu_limit_percent(&limit, cores),
        mem_usage_mb: mem_mb(current.memory_usage_bytes),
        mem_limit_mb: mem_mb(current.memory_limit_bytes),
        network_rx_bytes: current.network_rx_bytes,
        network_tx_bytes: current.network_tx_bytes,
        host_cpus: cores,
    })
}

fn policy_file(entries: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"allowed_ips": {entries}}}"#).unwrap();
    file.flush().unwrap();
    file
}

fn build_app(secret: &str, policy: Arc<PolicyStore>, backend: Arc<dyn RuntimeBackend>) -> Router {
    let gate = Arc::new(Gate::new(
        PanelSecret::from_secret(secret),
        policy,
        AgentMetrics::new(),
    ));
    let state = Arc::new(TestState {
        backend,
        cache: SampleCache::new(),
    });

    let protected = Router::new()
        .route("/container/list", get(list_handler))
        .route("/container/stats_by_name", post(stats_handler))
        .layer(middleware::from_fn_with_state(gate, panel_auth));

    Router::new()
        .route("/healthz", get(|| async { Json(json!({"status": "ok"})) }))
        .merge(protected)
        .with_state(state)
}

fn default_app(allowed_ips: &str) -> (Router, tempfile::NamedTempFile) {
    let file = policy_file(allowed_ips);
    let policy = Arc::new(PolicyStore::load(file.path()));
    let backend = Arc::new(StubBackend::with_snapshots(vec![
        snapshot(0, 100, 1000),
        snapshot(10, 150, 1100),
    ]));
    (build_app("test-secret", policy, backend), file)
}

fn request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .extension(ConnectInfo::<SocketAddr>("10.0.0.5:51000".parse().unwrap()));
    if let Some(token) = token {
        builder = builder.header("authorization", token);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_valid_token_and_address_is_admitted() {
    let (app, _file) = default_app(r#"["10.0.0.5"]"#);

    let response = app
        .oneshot(request("/container/list", Some("Bearer test-secret")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let containers = body_json(response).await;
    assert_eq!(containers[0]["Id"], "abc123");
}

#[tokio::test]
async fn test_wrong_token_is_unauthorized() {
    let (app, _file) = default_app(r#"["10.0.0.5"]"#);

    let response = app
        .oneshot(request("/container/list", Some("Bearer wrong")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Unauthorized");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (app, _file) = default_app(r#"["10.0.0.5"]"#);

    let response = app.oneshot(request("/container/list", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_disallowed_address_is_forbidden() {
    let (app, _file) = default_app(r#"["192.0.2.99"]"#);

    let response = app
        .oneshot(request("/container/list", Some("Bearer test-secret")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "Forbidden");
}

#[tokio::test]
async fn test_bad_token_wins_over_bad_address() {
    // Token is checked first; its failure must not leak address state.
    let (app, _file) = default_app(r#"["192.0.2.99"]"#);

    let response = app
        .oneshot(request("/container/list", Some("Bearer wrong")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wildcard_policy_admits_any_peer() {
    let (app, _file) = default_app(r#"["0.0.0.0"]"#);

    let response = app
        .oneshot(request("/container/list", Some("Bearer test-secret")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cidr_policy_admits_peer_in_block() {
    let (app, _file) = default_app(r#"["10.0.0.0/24"]"#);

    let response = app
        .oneshot(request("/container/list", Some("Bearer test-secret")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_for_governs_over_peer_address() {
    // Peer is allowed, but the forwarded-for chain says the request came
    // from somewhere else; the first entry is authoritative.
    let (app, _file) = default_app(r#"["10.0.0.5"]"#);

    let req = Request::builder()
        .uri("/container/list")
        .extension(ConnectInfo::<SocketAddr>("10.0.0.5:51000".parse().unwrap()))
        .header("authorization", "Bearer test-secret")
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.5")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_probes_bypass_the_gate() {
    let (app, _file) = default_app(r#"["192.0.2.99"]"#);

    let response = app.oneshot(request("/healthz", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stats_first_sample_then_delta() {
    let (app, _file) = default_app(r#"["0.0.0.0"]"#);

    let stats_request = || {
        Request::builder()
            .method("POST")
            .uri("/container/stats_by_name")
            .extension(ConnectInfo::<SocketAddr>("10.0.0.5:51000".parse().unwrap()))
            .header("authorization", "Bearer test-secret")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name": "web01"}"#))
            .unwrap()
    };

    // First call: no previous sample, absolute fallback (100/1000 * 4 * 100).
    let response = app.clone().oneshot(stats_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    assert_eq!(first["cpu_percent"], 40.0);
    assert_eq!(first["cpu_limit_percent"], 50.0);
    assert_eq!(first["mem_usage_mb"], 100.0);
    assert_eq!(first["mem_limit_mb"], 1024.0);
    assert_eq!(first["network_rx_bytes"], 2048);
    assert_eq!(first["network_tx_bytes"], 1024);
    assert_eq!(first["host_cpus"], 4);

    // Second call ten seconds later: delta-based, (50/100) * 4 * 100.
    let response = app.oneshot(stats_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let second = body_json(response).await;
    assert_eq!(second["cpu_percent"], 200.0);
}
