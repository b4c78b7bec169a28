//! Agent configuration

use agent_lib::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Agent configuration, read from the `--config` JSON file with
/// `AGENT_*` environment overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Panel installation root; the shared secret is read from
    /// `<project_path>/.env`
    #[serde(default = "default_project_path")]
    pub project_path: PathBuf,

    /// Docker daemon address (`unix://...` or `tcp://...`); empty means
    /// the platform default socket
    #[serde(default)]
    pub docker: String,

    /// Path to the network policy file (`{"allowed_ips": [...]}`)
    #[serde(default = "default_policy_path")]
    pub policy_path: PathBuf,
}

fn default_port() -> u16 {
    8080
}

fn default_project_path() -> PathBuf {
    PathBuf::from("/raweb/web/panel/")
}

fn default_policy_path() -> PathBuf {
    PathBuf::from("/raweb/apps/agent/config.json")
}

impl AgentConfig {
    /// Load configuration from the given file plus the environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingConfigFile(path.to_path_buf()));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Json))
            .add_source(config::Environment::with_prefix("AGENT"))
            .build()
            .map_err(|e| ConfigError::InvalidConfigFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigError::InvalidConfigFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Docker host as an `Option`, empty string meaning "use the default".
    pub fn docker_host(&self) -> Option<&str> {
        if self.docker.is_empty() {
            None
        } else {
            Some(self.docker.as_str())
        }
    }
}
