//! Common test utilities and setup

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use storyboard_checkpoint::{
    CheckpointStore, InMemoryCheckpointStore, ProjectCheckpoint, SqliteCheckpointStore,
};
use storyboard_workflow::testing::MockGenerator;
use storyboard_workflow::{ProjectPatch, ProjectService, RefinementPipeline};
use tempfile::TempDir;

static TEST_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Create a SQLite store backed by a unique file
pub async fn setup_sqlite_store() -> (TempDir, Arc<dyn CheckpointStore>) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let counter = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let db_path = temp_dir.path().join(format!("workflow_{}.db", counter));

    let store = SqliteCheckpointStore::connect(&db_path)
        .await
        .expect("Failed to create test database");

    (temp_dir, Arc::new(store))
}

pub fn memory_store() -> Arc<dyn CheckpointStore> {
    Arc::new(InMemoryCheckpointStore::new())
}

pub fn pipeline(store: Arc<dyn CheckpointStore>, generator: MockGenerator) -> RefinementPipeline {
    RefinementPipeline::new(ProjectService::new(store), Arc::new(generator))
}

pub fn basic_info() -> ProjectPatch {
    ProjectPatch {
        summary: Some("A keeper finds a message in a bottle.".to_string()),
        art_style: Some("ink wash".to_string()),
        protagonist: Some("Mara".to_string()),
        ..Default::default()
    }
}

/// Store wrapper that counts saves
pub struct CountingStore {
    inner: Arc<dyn CheckpointStore>,
    saves: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn CheckpointStore>) -> Self {
        Self {
            inner,
            saves: AtomicUsize::new(0),
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.saves.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl CheckpointStore for CountingStore {
    async fn save(&self, checkpoint: &ProjectCheckpoint) -> storyboard_checkpoint::Result<String> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(checkpoint).await
    }

    async fn load(&self, project_id: &str) -> storyboard_checkpoint::Result<Option<ProjectCheckpoint>> {
        self.inner.load(project_id).await
    }

    async fn list(&self) -> storyboard_checkpoint::Result<Vec<ProjectCheckpoint>> {
        self.inner.list().await
    }

    async fn delete(&self, project_id: &str) -> storyboard_checkpoint::Result<()> {
        self.inner.delete(project_id).await
    }
}
