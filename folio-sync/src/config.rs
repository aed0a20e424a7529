use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for cached collections and hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How long a fetched snapshot is served without a remote read.
    pub cache_ttl_secs: u64,
    /// Period of the hook's fallback polling task.
    pub poll_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            poll_interval_secs: 10,
        }
    }
}

impl SyncConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Never zero; a zero period is clamped to one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
