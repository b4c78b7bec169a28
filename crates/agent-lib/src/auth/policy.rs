//! Client network policy: which source addresses may reach the agent
//!
//! The policy is read from a JSON document of the form
//! `{"allowed_ips": ["0.0.0.0", "10.0.0.5", "192.168.0.0/24"]}`. An
//! unreadable or unparseable file, or an empty list, falls back to
//! allow-all: the token check still applies, so this trades IP pinning
//! for not locking the panel out on a bad config push. That fallback is
//! deliberate and must stay observable in logs and metrics.

use ipnet::IpNet;
use serde::Deserialize;
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Wildcard entry that admits every source address.
const WILDCARD_ENTRY: &str = "0.0.0.0";

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    allowed_ips: Vec<String>,
}

/// Parsed admission rules for client source addresses.
#[derive(Debug, Clone, Default)]
pub struct NetworkPolicy {
    allow_all: bool,
    /// True when allow-all was forced by a load failure rather than an
    /// explicit wildcard entry.
    fail_open: bool,
    exact: HashSet<IpAddr>,
    blocks: Vec<IpNet>,
}

impl NetworkPolicy {
    /// A policy that admits every address (explicit, not fail-open).
    pub fn allow_all() -> Self {
        Self {
            allow_all: true,
            ..Self::default()
        }
    }

    fn fail_open() -> Self {
        Self {
            allow_all: true,
            fail_open: true,
            ..Self::default()
        }
    }

    /// Load the policy from `path`, falling back to allow-all on any error.
    pub fn load(path: &Path) -> Self {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "could not read network policy, defaulting to allow-all"
                );
                return Self::fail_open();
            }
        };
        let file: PolicyFile = match serde_json::from_slice(&data) {
            Ok(file) => file,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "could not parse network policy, defaulting to allow-all"
                );
                return Self::fail_open();
            }
        };
        if file.allowed_ips.is_empty() {
            return Self::fail_open();
        }
        Self::parse(&file.allowed_ips)
    }

    /// Build a policy from raw `allowed_ips` entries.
    ///
    /// Invalid entries are logged and discarded; one bad entry never fails
    /// the whole load.
    pub fn parse(entries: &[String]) -> Self {
        let mut policy = Self::default();
        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            if entry == WILDCARD_ENTRY {
                policy.allow_all = true;
                continue;
            }
            if let Ok(block) = entry.parse::<IpNet>() {
                policy.blocks.push(block);
                continue;
            }
            if let Ok(ip) = entry.parse::<IpAddr>() {
                policy.exact.insert(ip.to_canonical());
                continue;
            }
            warn!(entry, "ignoring invalid allowed_ips entry");
        }
        if policy.exact.is_empty() && policy.blocks.is_empty() && !policy.allow_all {
            // Every entry was discarded, same fallback as an empty list.
            return Self::fail_open();
        }
        policy
    }

    /// Whether `addr` is admitted by this policy.
    ///
    /// Allow-all admits unconditionally, without requiring `addr` to parse.
    pub fn allows(&self, addr: &str) -> bool {
        if self.allow_all {
            return true;
        }
        let ip: IpAddr = match addr.parse() {
            Ok(ip) => ip,
            Err(_) => return false,
        };
        let ip = ip.to_canonical();
        if self.exact.contains(&ip) {
            return true;
        }
        self.blocks.iter().any(|block| block.contains(&ip))
    }

    /// True when the policy fell back to allow-all due to a load failure.
    pub fn is_fail_open(&self) -> bool {
        self.fail_open
    }

    /// True when every address is admitted, for whatever reason.
    pub fn is_allow_all(&self) -> bool {
        self.allow_all
    }
}

/// Holds the current [`NetworkPolicy`] and supports hot reload.
///
/// Readers grab an `Arc` snapshot; `reload` swaps the whole policy in one
/// write, so a request never sees a half-updated rule set.
#[derive(Debug)]
pub struct PolicyStore {
    path: PathBuf,
    current: RwLock<Arc<NetworkPolicy>>,
}

impl PolicyStore {
    /// Load the policy from `path` and keep the path for later reloads.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let policy = Arc::new(NetworkPolicy::load(&path));
        Self {
            path,
            current: RwLock::new(policy),
        }
    }

    /// Snapshot of the current policy.
    pub fn current(&self) -> Arc<NetworkPolicy> {
        self.current.read().expect("policy lock poisoned").clone()
    }

    /// Re-read the policy file and swap in the result atomically.
    pub fn reload(&self) -> Arc<NetworkPolicy> {
        let policy = Arc::new(NetworkPolicy::load(&self.path));
        info!(
            path = %self.path.display(),
            allow_all = policy.is_allow_all(),
            fail_open = policy.is_fail_open(),
            "network policy reloaded"
        );
        let mut guard = self.current.write().expect("policy lock poisoned");
        *guard = policy.clone();
        policy
    }
}
