//! Panel Agent CLI
//!
//! Operator tool for inspecting and driving the panel host agent:
//! containers, networks, images, and one-shot stats.

mod client;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::AgentClient;
use output::OutputFormat;
use serde_json::json;
use tabled::Tabled;

/// Panel Agent CLI
#[derive(Parser)]
#[command(name = "panelctl")]
#[command(author, version, about = "CLI for the panel host agent", long_about = None)]
pub struct Cli {
    /// Agent endpoint URL (can also be set via PANEL_AGENT_URL env var)
    #[arg(long, env = "PANEL_AGENT_URL", default_value = "http://localhost:8080")]
    pub endpoint: String,

    /// Bearer token, the panel's APP_KEY (env: PANEL_AGENT_TOKEN)
    #[arg(long, env = "PANEL_AGENT_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List containers on the host
    Containers,

    /// List networks on the host
    Networks,

    /// List images on the host
    Images,

    /// Show instantaneous stats for a container
    Stats {
        /// Container name
        name: String,
    },

    /// Start a container
    Start {
        /// Container id
        id: String,
    },

    /// Stop a container
    Stop {
        /// Container id
        id: String,
    },

    /// Kill a container
    Kill {
        /// Container id
        id: String,
    },

    /// Delete a container
    Delete {
        /// Container id
        id: String,
    },
}

#[derive(Tabled, serde::Serialize)]
struct ContainerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "IMAGE")]
    image: String,
    #[tabled(rename = "STATE")]
    state: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

#[derive(Tabled, serde::Serialize)]
struct NetworkRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "DRIVER")]
    driver: String,
    #[tabled(rename = "SCOPE")]
    scope: String,
}

#[derive(Tabled, serde::Serialize)]
struct ImageRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "TAGS")]
    tags: String,
    #[tabled(rename = "SIZE")]
    size: String,
}

fn short_id(id: &str) -> String {
    let id = id.trim_start_matches("sha256:");
    id.chars().take(12).collect()
}

async fn run(cli: Cli) -> Result<()> {
    let client = AgentClient::new(&cli.endpoint, &cli.token)?;

    match cli.command {
        Commands::Containers => {
            let containers: Vec<client::ContainerInfo> = client.get("/container/list").await?;
            let rows: Vec<ContainerRow> = containers
                .iter()
                .map(|c| ContainerRow {
                    id: short_id(&c.id),
                    name: c
                        .names
                        .first()
                        .map(|n| n.trim_start_matches('/').to_string())
                        .unwrap_or_default(),
                    image: c.image.clone(),
                    state: output::color_state(&c.state),
                    status: c.status.clone(),
                })
                .collect();
            output::print_table(&rows, cli.format);
        }
        Commands::Networks => {
            let list: client::NetworkList = client.get("/network/list").await?;
            let rows: Vec<NetworkRow> = list
                .networks
                .iter()
                .map(|n| NetworkRow {
                    id: short_id(&n.id),
                    name: n.name.clone(),
                    driver: n.driver.clone(),
                    scope: n.scope.clone(),
                })
                .collect();
            output::print_table(&rows, cli.format);
        }
        Commands::Images => {
            let images: Vec<client::ImageInfo> = client.get("/image/list").await?;
            let rows: Vec<ImageRow> = images
                .iter()
                .map(|i| ImageRow {
                    id: short_id(&i.id),
                    tags: i.repo_tags.join(", "),
                    size: output::format_bytes(i.size.max(0) as u64),
                })
                .collect();
            output::print_table(&rows, cli.format);
        }
        Commands::Stats { name } => {
            let stats: client::ContainerStats = client
                .post("/container/stats_by_name", &json!({ "name": name }))
                .await?;
            println!("cpu:       {:.1}% (limit {:.1}%)", stats.cpu_percent, stats.cpu_limit_percent);
            println!("memory:    {:.1}Mi / {:.1}Mi", stats.mem_usage_mb, stats.mem_limit_mb);
            println!(
                "network:   rx {} / tx {}",
                output::format_bytes(stats.network_rx_bytes),
                output::format_bytes(stats.network_tx_bytes)
            );
            println!("host cpus: {}", stats.host_cpus);
        }
        Commands::Start { id } => {
            let resp: client::MessageResponse =
                client.post("/container/start", &json!({ "id": id })).await?;
            output::print_success(&resp.message);
        }
        Commands::Stop { id } => {
            let resp: client::MessageResponse =
                client.post("/container/stop", &json!({ "id": id })).await?;
            output::print_success(&resp.message);
        }
        Commands::Kill { id } => {
            let resp: client::MessageResponse =
                client.post("/container/kill", &json!({ "id": id })).await?;
            output::print_success(&resp.message);
        }
        Commands::Delete { id } => {
            let resp: client::MessageResponse =
                client.post("/container/delete", &json!({ "id": id })).await?;
            output::print_success(&resp.message);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}
