//! Host configuration for a membership store.

use crate::catalog::{DEFAULT_TABLE_NAME, SQLITE};
use crate::errors::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default backing-store call timeout.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Database identifier; only selects the query catalog variant.
    pub database: String,

    /// SQLite file. In-memory when unset.
    pub path: Option<PathBuf>,

    pub table_name: String,

    /// Namespace used by hosts when an operation does not name one.
    pub namespace: Option<String>,

    pub cache_enabled: bool,

    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: SQLITE.to_string(),
            path: None,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            namespace: None,
            cache_enabled: true,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    pub fn from_yaml_str(s: &str) -> StoreResult<Self> {
        // serde_yaml rejects an empty document; treat it as all defaults
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> StoreResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_yaml_str(&raw).map_err(|e| match e {
            StoreError::Config(msg) => StoreError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
