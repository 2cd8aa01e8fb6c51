//! Runtime settings of the phase-sync controller, read from the environment.

use crate::apis::{DatabaseKind, KindRegistry};
use crate::{Error, Result};
use std::time::Duration;

pub const BIND_ADDRESS: &str = "KUBEDB_BIND_ADDRESS";
pub const FIELD_MANAGER: &str = "KUBEDB_FIELD_MANAGER";
pub const REQUEUE_SECONDS: &str = "KUBEDB_REQUEUE_SECONDS";
pub const KINDS: &str = "KUBEDB_KINDS";
pub const SHUTDOWN_TIMEOUT_SECONDS: &str = "KUBEDB_SHUTDOWN_TIMEOUT_SECONDS";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Address of the metrics and health endpoints.
    pub bind_address: String,
    /// Field manager used for server-side apply of `.status.phase`.
    pub field_manager: String,
    /// How long to wait before looking at an unchanged resource again.
    pub requeue: Duration,
    pub shutdown_timeout_seconds: u64,
    pub kinds: Vec<DatabaseKind>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".into(),
            field_manager: "kubedb-phase-sync".into(),
            requeue: Duration::from_secs(5 * 60),
            shutdown_timeout_seconds: 5,
            kinds: DatabaseKind::ALL.to_vec(),
        }
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| Error::InvalidConfig(format!("{key}={value:?}: {e}")))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, falling back to the defaults
    /// for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup(BIND_ADDRESS) {
            config.bind_address = addr;
        }
        if let Some(manager) = lookup(FIELD_MANAGER) {
            if manager.trim().is_empty() {
                return Err(Error::InvalidConfig(format!("{FIELD_MANAGER} must not be empty")));
            }
            config.field_manager = manager;
        }
        if let Some(secs) = lookup(REQUEUE_SECONDS) {
            let secs = parse_seconds(REQUEUE_SECONDS, &secs)?;
            if secs == 0 {
                return Err(Error::InvalidConfig(format!("{REQUEUE_SECONDS} must be positive")));
            }
            config.requeue = Duration::from_secs(secs);
        }
        if let Some(secs) = lookup(SHUTDOWN_TIMEOUT_SECONDS) {
            config.shutdown_timeout_seconds = parse_seconds(SHUTDOWN_TIMEOUT_SECONDS, &secs)?;
        }
        if let Some(kinds) = lookup(KINDS) {
            config.kinds = kinds
                .split(',')
                .filter(|k| !k.trim().is_empty())
                .map(str::parse)
                .collect::<Result<Vec<DatabaseKind>>>()?;
            if config.kinds.is_empty() {
                return Err(Error::InvalidConfig(format!("{KINDS} names no kind")));
            }
        }

        Ok(config)
    }

    pub fn registry(&self) -> KindRegistry {
        KindRegistry::for_kinds(&self.kinds)
    }
}
