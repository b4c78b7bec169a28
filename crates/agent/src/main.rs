//! Panel Agent - privileged host agent for the control panel
//!
//! Exposes container, network and image operations on this host to the
//! panel over an authenticated HTTP API.

use agent_lib::{
    auth::{Gate, PanelSecret, PolicyStore},
    health::{components, HealthRegistry},
    observability::{AgentMetrics, StructuredLogger},
    runtime::{DockerBackend, RuntimeBackend},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod handlers;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Panel host agent
#[derive(Parser)]
#[command(name = "panel-agent", version, about = "Host agent for the control panel")]
struct Cli {
    /// Full path to the configuration JSON file
    #[arg(long)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let cli = Cli::parse();
    if !cli.config.is_absolute() {
        anyhow::bail!(
            "config path must be absolute (full path): {}",
            cli.config.display()
        );
    }

    let cfg = config::AgentConfig::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    info!(config = %cli.config.display(), port = cfg.port, "Agent configured");

    // The shared secret is fatal when missing: the agent must never come up
    // with authentication silently disabled.
    let secret = PanelSecret::load(&cfg.project_path)?;

    let metrics = AgentMetrics::new();
    let host_name = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
    let logger = StructuredLogger::new(&host_name);

    // Network policy: load failures fall back to allow-all, loudly.
    let policy = Arc::new(PolicyStore::load(&cfg.policy_path));
    let initial = policy.current();
    metrics.set_policy_fail_open(initial.is_fail_open());
    logger.log_policy_loaded(
        &cfg.policy_path.display().to_string(),
        initial.is_allow_all(),
        initial.is_fail_open(),
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::RUNTIME).await;
    health_registry.register(components::POLICY).await;
    if initial.is_fail_open() {
        health_registry
            .set_degraded(components::POLICY, "Running fail-open, all addresses admitted")
            .await;
    }

    let backend = DockerBackend::connect(cfg.docker_host())?;
    match backend.ping().await {
        Ok(()) => health_registry.set_healthy(components::RUNTIME).await,
        Err(e) => {
            warn!(error = %e, "Docker daemon not reachable at startup");
            health_registry
                .set_degraded(components::RUNTIME, e.to_string())
                .await;
        }
    }

    let gate = Arc::new(Gate::new(secret, policy.clone(), metrics.clone()));
    let state = Arc::new(api::AppState::new(
        Arc::new(backend),
        metrics.clone(),
        health_registry.clone(),
    ));

    // SIGHUP swaps in a freshly parsed policy without a restart.
    spawn_policy_reload(
        policy,
        cfg.policy_path.clone(),
        metrics.clone(),
        health_registry.clone(),
        logger.clone(),
    );

    health_registry.set_ready(true).await;
    logger.log_startup(AGENT_VERSION, &format!("0.0.0.0:{}", cfg.port));

    let server = tokio::spawn(api::serve(cfg.port, state, gate));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    server.abort();

    Ok(())
}

fn spawn_policy_reload(
    policy: Arc<PolicyStore>,
    path: PathBuf,
    metrics: AgentMetrics,
    health_registry: HealthRegistry,
    logger: StructuredLogger,
) {
    tokio::spawn(async move {
        let mut hup = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup()) {
            Ok(hup) => hup,
            Err(e) => {
                warn!(error = %e, "could not install SIGHUP handler, policy reload disabled");
                return;
            }
        };
        while hup.recv().await.is_some() {
            let reloaded = policy.reload();
            metrics.inc_policy_reloads();
            metrics.set_policy_fail_open(reloaded.is_fail_open());
            logger.log_policy_loaded(
                &path.display().to_string(),
                reloaded.is_allow_all(),
                reloaded.is_fail_open(),
            );
            if reloaded.is_fail_open() {
                health_registry
                    .set_degraded(components::POLICY, "Running fail-open, all addresses admitted")
                    .await;
            } else {
                health_registry.set_healthy(components::POLICY).await;
            }
        }
    });
}
