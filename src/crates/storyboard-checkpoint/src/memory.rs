//! In-memory checkpoint store
//!
//! [`InMemoryCheckpointStore`] keeps checkpoints in an `Arc<RwLock<HashMap>>`
//! for the lifetime of the process. It is the default backend for tests and
//! ephemeral sessions; data is lost on restart.

use crate::checkpoint::ProjectCheckpoint;
use crate::error::{CheckpointError, Result};
use crate::traits::{save_timestamps, CheckpointStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type CheckpointStorage = Arc<RwLock<HashMap<String, ProjectCheckpoint>>>;

/// Process-lifetime checkpoint store
#[derive(Debug, Clone)]
pub struct InMemoryCheckpointStore {
    storage: CheckpointStorage,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored checkpoints
    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.is_empty()
    }

    /// Clear all checkpoints (useful for testing)
    pub async fn clear(&self) {
        self.storage.write().await.clear();
    }
}

impl Default for InMemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, checkpoint: &ProjectCheckpoint) -> Result<String> {
        if checkpoint.project_id.is_empty() {
            return Err(CheckpointError::Invalid("project_id is required".to_string()));
        }

        let mut storage = self.storage.write().await;
        let existing = storage
            .get(&checkpoint.project_id)
            .map(|stored| (stored.created_at, stored.updated_at));
        let (created_at, updated_at) = save_timestamps(checkpoint, existing);

        let mut stored = checkpoint.clone();
        stored.created_at = created_at;
        stored.updated_at = updated_at;
        storage.insert(stored.project_id.clone(), stored);

        debug!(project_id = %checkpoint.project_id, "Saved checkpoint in memory");
        Ok(checkpoint.project_id.clone())
    }

    async fn load(&self, project_id: &str) -> Result<Option<ProjectCheckpoint>> {
        Ok(self.storage.read().await.get(project_id).cloned())
    }

    async fn list(&self) -> Result<Vec<ProjectCheckpoint>> {
        let mut checkpoints: Vec<ProjectCheckpoint> =
            self.storage.read().await.values().cloned().collect();
        checkpoints.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(checkpoints)
    }

    async fn delete(&self, project_id: &str) -> Result<()> {
        if self.storage.write().await.remove(project_id).is_some() {
            debug!(project_id = %project_id, "Deleted checkpoint from memory");
        }
        Ok(())
    }
}
