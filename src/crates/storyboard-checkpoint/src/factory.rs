//! Backend selection
//!
//! The backend is chosen once, when the store is built, from a
//! [`StoreConfig`]. Callers only ever see `Arc<dyn CheckpointStore>`.

use crate::error::{CheckpointError, Result};
use crate::memory::InMemoryCheckpointStore;
use crate::sqlite::SqliteCheckpointStore;
use crate::traits::CheckpointStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Available checkpoint backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => f.write_str("memory"),
            StoreBackend::Sqlite => f.write_str("sqlite"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = CheckpointError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "sqlite" | "sql" | "true" | "1" => Ok(StoreBackend::Sqlite),
            other => Err(CheckpointError::Config(format!(
                "Unknown store backend: {}. Supported: memory, sqlite",
                other
            ))),
        }
    }
}

/// Checkpoint store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database file, used by the sqlite backend
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data").join("storyboard.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_database_path(),
        }
    }
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: path.into(),
        }
    }
}

/// Build the configured checkpoint store
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn CheckpointStore>> {
    info!(backend = %config.backend, "Creating checkpoint store");
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryCheckpointStore::new())),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteCheckpointStore::connect(&config.path).await?)),
    }
}
