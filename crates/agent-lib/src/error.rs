//! Error types for the panel agent

use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration errors.
///
/// Any of these means the agent must not start serving traffic: a missing
/// shared secret would silently disable authentication otherwise.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load env file {path}: {reason}")]
    EnvFileUnreadable { path: PathBuf, reason: String },

    #[error("APP_KEY not set or empty in {path}")]
    MissingSecret { path: PathBuf },

    #[error("config file does not exist: {0}")]
    MissingConfigFile(PathBuf),

    #[error("failed to parse config file {path}: {reason}")]
    InvalidConfigFile { path: PathBuf, reason: String },
}
