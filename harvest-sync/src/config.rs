use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for loaders and the mutation controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote collection to page through.
    pub resource: String,
    /// Records requested per page.
    pub page_size: usize,
    /// Bound on every remote call (ms). Expiry counts as a failure.
    pub remote_timeout_ms: u64,
}

impl SyncConfig {
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            resource: "posts".to_string(),
            page_size: 10,
            remote_timeout_ms: 15_000,
        }
    }
}
