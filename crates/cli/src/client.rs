//! HTTP client for the panel agent API

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// Client for the agent's authenticated API
pub struct AgentClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl AgentClient {
    /// Create a new agent client
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid agent URL")?;

        Ok(Self {
            client,
            base_url,
            token: token.to_string(),
        })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Agent error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Agent error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types (field names follow the Docker API for pass-through
// endpoints, snake_case for the agent's own stats endpoint)

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInfo {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Names", default)]
    pub names: Vec<String>,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Status", default)]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInfo {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Driver", default)]
    pub driver: String,
    #[serde(rename = "Scope", default)]
    pub scope: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkList {
    pub networks: Vec<NetworkInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "RepoTags", default)]
    pub repo_tags: Vec<String>,
    #[serde(rename = "Size", default)]
    pub size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerStats {
    pub cpu_percent: f64,
    pub cpu_limit_percent: f64,
    pub mem_usage_mb: f64,
    pub mem_limit_mb: f64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
    pub host_cpus: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/container/list")
            .match_header("authorization", "Bearer sekrit")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"Id": "abc", "Names": ["/web01"], "Image": "nginx"}]"#)
            .create_async()
            .await;

        let client = AgentClient::new(&server.url(), "sekrit").unwrap();
        let containers: Vec<ContainerInfo> = client.get("/container/list").await.unwrap();

        mock.assert_async().await;
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].id, "abc");
        assert_eq!(containers[0].image, "nginx");
    }

    #[tokio::test]
    async fn error_status_surfaces_the_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/container/stats_by_name")
            .with_status(403)
            .with_body(r#"{"error": "Forbidden"}"#)
            .create_async()
            .await;

        let client = AgentClient::new(&server.url(), "sekrit").unwrap();
        let result: Result<ContainerStats> = client
            .post("/container/stats_by_name", &serde_json::json!({"name": "x"}))
            .await;

        let err = result.unwrap_err().to_string();
        assert!(err.contains("403"));
        assert!(err.contains("Forbidden"));
    }

    #[tokio::test]
    async fn stats_response_parses() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/container/stats_by_name")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "cpu_percent": 200.0,
                    "cpu_limit_percent": 50.0,
                    "mem_usage_mb": 100.0,
                    "mem_limit_mb": 1024.0,
                    "network_rx_bytes": 2048,
                    "network_tx_bytes": 1024,
                    "host_cpus": 4
                }"#,
            )
            .create_async()
            .await;

        let client = AgentClient::new(&server.url(), "sekrit").unwrap();
        let stats: ContainerStats = client
            .post("/container/stats_by_name", &serde_json::json!({"name": "web01"}))
            .await
            .unwrap();

        assert_eq!(stats.cpu_percent, 200.0);
        assert_eq!(stats.host_cpus, 4);
    }
}
