//! Docker implementation of the runtime backend

use super::{async_trait, CreateContainerSpec, CreateNetworkSpec, RuntimeBackend};
use crate::models::{CounterSnapshot, CpuLimit};
use anyhow::{Context, Result};
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, KillContainerOptions,
    ListContainersOptions, RemoveContainerOptions, StartContainerOptions, StatsOptions,
    StopContainerOptions,
};
use bollard::image::{ListImagesOptions, RemoveImageOptions};
use bollard::models::{
    ContainerCreateResponse, ContainerInspectResponse, ContainerSummary, HostConfig, ImageSummary,
    Ipam, IpamConfig, Network, NetworkCreateResponse, PortBinding,
};
use bollard::network::{CreateNetworkOptions, ListNetworksOptions};
use bollard::{Docker, API_DEFAULT_VERSION};
use chrono::Utc;
use futures_util::StreamExt;
use std::collections::HashMap;

const CONNECT_TIMEOUT_SECS: u64 = 120;

/// Docker-backed [`RuntimeBackend`] over a bollard client.
#[derive(Clone)]
pub struct DockerBackend {
    docker: Docker,
}

impl DockerBackend {
    /// Connect to the daemon at `host` (`unix://...` or `tcp://...`),
    /// or at the platform default when `host` is empty.
    pub fn connect(host: Option<&str>) -> Result<Self> {
        let docker = match host.filter(|h| !h.is_empty()) {
            None => Docker::connect_with_local_defaults(),
            Some(h) if h.starts_with("unix://") => Docker::connect_with_socket(
                h.trim_start_matches("unix://"),
                CONNECT_TIMEOUT_SECS,
                API_DEFAULT_VERSION,
            ),
            Some(h) => Docker::connect_with_http(h, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION),
        }
        .context("failed to connect to the Docker daemon")?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl RuntimeBackend for DockerBackend {
    async fn ping(&self) -> Result<()> {
        self.docker.ping().await?;
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                ..Default::default()
            }))
            .await?;
        Ok(containers)
    }

    async fn create_container(&self, spec: CreateContainerSpec) -> Result<ContainerCreateResponse> {
        let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
        let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
        for (container_port, host_port) in &spec.ports {
            exposed_ports.insert(container_port.clone(), HashMap::new());
            port_bindings.insert(
                container_port.clone(),
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: Some(host_port.clone()),
                }]),
            );
        }

        let host_config = HostConfig {
            port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
            network_mode: spec.network.clone(),
            memory: spec.memory_bytes,
            nano_cpus: spec.nano_cpus,
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image),
            env: (!spec.env.is_empty()).then_some(spec.env),
            labels: (!spec.labels.is_empty()).then_some(spec.labels),
            exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: spec.name,
                    platform: None,
                }),
                config,
            )
            .await?;
        Ok(created)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        self.docker
            .stop_container(id, None::<StopContainerOptions>)
            .await?;
        Ok(())
    }

    async fn kill_container(&self, id: &str) -> Result<()> {
        self.docker
            .kill_container(id, Some(KillContainerOptions { signal: "SIGKILL" }))
            .await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    v: false,
                    link: false,
                    force: true,
                }),
            )
            .await?;
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspectResponse> {
        let inspected = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        Ok(inspected)
    }

    async fn find_container_by_name(&self, name: &str) -> Result<Option<ContainerSummary>> {
        let mut filters = HashMap::new();
        filters.insert("name".to_string(), vec![name.to_string()]);
        let candidates = self
            .docker
            .list_containers(Some(ListContainersOptions {
                all: true,
                filters,
                ..Default::default()
            }))
            .await?;
        // The name filter is a substring match; require the exact name.
        let wanted = format!("/{name}");
        Ok(candidates.into_iter().find(|c| {
            c.names
                .as_ref()
                .is_some_and(|names| names.iter().any(|n| n == &wanted || n == name))
        }))
    }

    async fn cpu_limit(&self, id: &str) -> Result<CpuLimit> {
        let inspected = self.inspect_container(id).await?;
        Ok(cpu_limit_from_inspect(&inspected))
    }

    async fn one_shot_stats(&self, id: &str) -> Result<CounterSnapshot> {
        let mut stream = self.docker.stats(
            id,
            Some(StatsOptions {
                stream: false,
                one_shot: true,
            }),
        );
        let stats = stream
            .next()
            .await
            .context("runtime returned no stats for container")??;

        let percpu_count = stats
            .cpu_stats
            .online_cpus
            .map(|n| n as usize)
            .filter(|&n| n > 0)
            .or_else(|| {
                stats
                    .cpu_stats
                    .cpu_usage
                    .percpu_usage
                    .as_ref()
                    .map(|per| per.len())
            })
            .unwrap_or(0);

        let (rx, tx) = stats
            .networks
            .as_ref()
            .map(|ifaces| {
                ifaces.values().fold((0u64, 0u64), |(rx, tx), net| {
                    (rx + net.rx_bytes, tx + net.tx_bytes)
                })
            })
            .unwrap_or((0, 0));

        // Daemons can return the zero time on the very first one-shot read.
        let observed_at = if stats.read.timestamp() > 0 {
            stats.read
        } else {
            Utc::now()
        };

        Ok(CounterSnapshot {
            cpu_total_ns: stats.cpu_stats.cpu_usage.total_usage,
            system_total_ns: stats.cpu_stats.system_cpu_usage.unwrap_or(0),
            percpu_count,
            memory_usage_bytes: stats.memory_stats.usage.unwrap_or(0),
            memory_limit_bytes: stats.memory_stats.limit.unwrap_or(0),
            network_rx_bytes: rx,
            network_tx_bytes: tx,
            observed_at,
        })
    }

    async fn create_network(&self, spec: CreateNetworkSpec) -> Result<NetworkCreateResponse> {
        let mut ipam_config = Vec::new();
        if !spec.subnet.is_empty() || !spec.gateway.is_empty() {
            ipam_config.push(IpamConfig {
                subnet: (!spec.subnet.is_empty()).then(|| spec.subnet.clone()),
                gateway: (!spec.gateway.is_empty()).then(|| spec.gateway.clone()),
                ..Default::default()
            });
        }

        let created = self
            .docker
            .create_network(CreateNetworkOptions {
                name: spec.name,
                driver: spec.driver,
                internal: spec.internal,
                attachable: spec.attachable,
                enable_ipv6: spec.enable_ipv6,
                ipam: Ipam {
                    driver: Some("default".to_string()),
                    config: Some(ipam_config),
                    ..Default::default()
                },
                labels: spec.labels,
                options: spec.options,
                ..Default::default()
            })
            .await?;
        Ok(created)
    }

    async fn list_networks(&self) -> Result<Vec<Network>> {
        let networks = self
            .docker
            .list_networks(None::<ListNetworksOptions<String>>)
            .await?;
        Ok(networks)
    }

    async fn remove_network(&self, id: &str) -> Result<()> {
        self.docker.remove_network(id).await?;
        Ok(())
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>> {
        let images = self
            .docker
            .list_images(Some(ListImagesOptions::<String> {
                all: true,
                ..Default::default()
            }))
            .await?;
        Ok(images)
    }

    async fn remove_image(&self, reference: &str) -> Result<()> {
        self.docker
            .remove_image(
                reference,
                Some(RemoveImageOptions {
                    force: true,
                    noprune: false,
                }),
                None,
            )
            .await?;
        Ok(())
    }
}

/// Pull the configured CPU limit out of an inspect response.
pub fn cpu_limit_from_inspect(inspected: &ContainerInspectResponse) -> CpuLimit {
    match &inspected.host_config {
        Some(host_config) => CpuLimit {
            nano_cpus: host_config.nano_cpus,
            quota: host_config.cpu_quota,
            period: host_config.cpu_period,
        },
        None => CpuLimit::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_limit_extraction_from_host_config() {
        let inspected = ContainerInspectResponse {
            host_config: Some(HostConfig {
                nano_cpus: Some(1_500_000_000),
                cpu_quota: Some(50_000),
                cpu_period: Some(100_000),
                ..Default::default()
            }),
            ..Default::default()
        };
        let limit = cpu_limit_from_inspect(&inspected);
        assert_eq!(limit.nano_cpus, Some(1_500_000_000));
        assert_eq!(limit.quota, Some(50_000));
        assert_eq!(limit.period, Some(100_000));
    }

    #[test]
    fn cpu_limit_defaults_without_host_config() {
        let inspected = ContainerInspectResponse::default();
        assert_eq!(cpu_limit_from_inspect(&inspected), CpuLimit::default());
    }
}
