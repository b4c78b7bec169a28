//! Runtime backend capability interface
//!
//! Everything the agent needs from the container runtime, behind one trait
//! so handlers can be exercised against a mock. Pass-through operations
//! return the runtime's own model types unchanged; only the stats path maps
//! into our [`CounterSnapshot`] so the rate calculator stays independent of
//! the runtime's wire format.

mod docker;

pub use docker::DockerBackend;

use crate::models::{CounterSnapshot, CpuLimit};
use anyhow::Result;
use bollard::models::{
    ContainerCreateResponse, ContainerInspectResponse, ContainerSummary, ImageSummary, Network,
    NetworkCreateResponse,
};
use std::collections::HashMap;

pub use async_trait::async_trait;

/// Container creation request, as the panel sends it.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct CreateContainerSpec {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Container port spec (e.g. `"80/tcp"`) to host port.
    #[serde(default)]
    pub ports: HashMap<String, String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub memory_bytes: Option<i64>,
    #[serde(default)]
    pub nano_cpus: Option<i64>,
}

/// Network creation request, as the panel sends it.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct CreateNetworkSpec {
    pub name: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub attachable: bool,
    #[serde(default)]
    pub enable_ipv6: bool,
    #[serde(default)]
    pub subnet: String,
    #[serde(default)]
    pub gateway: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

/// Operations the agent performs against the container runtime.
#[async_trait]
pub trait RuntimeBackend: Send + Sync {
    /// Verify the runtime is reachable.
    async fn ping(&self) -> Result<()>;

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>>;

    async fn create_container(&self, spec: CreateContainerSpec) -> Result<ContainerCreateResponse>;

    async fn start_container(&self, id: &str) -> Result<()>;

    async fn stop_container(&self, id: &str) -> Result<()>;

    async fn kill_container(&self, id: &str) -> Result<()>;

    async fn remove_container(&self, id: &str) -> Result<()>;

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspectResponse>;

    /// Exact-name lookup; `None` when no container carries that name.
    async fn find_container_by_name(&self, name: &str) -> Result<Option<ContainerSummary>>;

    /// Configured hard CPU limit for a container.
    async fn cpu_limit(&self, id: &str) -> Result<CpuLimit>;

    /// One-shot cumulative counters for a container.
    async fn one_shot_stats(&self, id: &str) -> Result<CounterSnapshot>;

    async fn create_network(&self, spec: CreateNetworkSpec) -> Result<NetworkCreateResponse>;

    async fn list_networks(&self) -> Result<Vec<Network>>;

    async fn remove_network(&self, id: &str) -> Result<()>;

    async fn list_images(&self) -> Result<Vec<ImageSummary>>;

    async fn remove_image(&self, reference: &str) -> Result<()>;
}
