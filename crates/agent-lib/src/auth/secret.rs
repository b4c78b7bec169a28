//! Shared secret loading and credential comparison
//!
//! The agent authenticates the panel with the panel's own `APP_KEY`, read
//! from the panel installation's `.env` file at startup. A missing or empty
//! key is fatal: it must never silently degrade to "no auth required".

use crate::error::ConfigError;
use std::fmt;
use std::path::Path;

const SECRET_ENV_VAR: &str = "APP_KEY";
const BEARER_PREFIX: &str = "Bearer ";

/// The shared bearer secret, immutable for the process lifetime.
#[derive(Clone)]
pub struct PanelSecret {
    /// Precomputed `"Bearer <secret>"` so each request is one comparison.
    expected_header: String,
}

impl PanelSecret {
    /// Load the secret from `<project_path>/.env`.
    pub fn load(project_path: &Path) -> Result<Self, ConfigError> {
        let env_path = project_path.join(".env");
        dotenv::from_path(&env_path).map_err(|e| ConfigError::EnvFileUnreadable {
            path: env_path.clone(),
            reason: e.to_string(),
        })?;

        let secret = std::env::var(SECRET_ENV_VAR).unwrap_or_default();
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret { path: env_path });
        }
        Ok(Self::from_secret(&secret))
    }

    /// Build directly from a secret value (used by tests and embedding).
    pub fn from_secret(secret: &str) -> Self {
        Self {
            expected_header: format!("{BEARER_PREFIX}{secret}"),
        }
    }

    /// Compare a presented `Authorization` header value against
    /// `"Bearer <secret>"` in constant time.
    pub fn matches_header(&self, presented: &str) -> bool {
        constant_time_eq(presented.as_bytes(), self.expected_header.as_bytes())
    }
}

impl fmt::Debug for PanelSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelSecret").finish_non_exhaustive()
    }
}

/// Byte equality that does not short-circuit on the first mismatch.
///
/// Length is not secret here (the prefix and key length are fixed per
/// deployment), only the content comparison needs to be branch-free.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
