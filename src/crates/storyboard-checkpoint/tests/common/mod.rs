//! Common test utilities and setup

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use storyboard_checkpoint::{
    CheckpointStore, InMemoryCheckpointStore, ProjectCheckpoint, Scene, SceneStatus,
    SqliteCheckpointStore, WorkflowState,
};
use tempfile::TempDir;

static TEST_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Create a SQLite store backed by a unique file
pub async fn setup_sqlite_store() -> (TempDir, Arc<dyn CheckpointStore>) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let counter = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let db_path = temp_dir.path().join(format!("test_{}.db", counter));

    let store = SqliteCheckpointStore::connect(&db_path)
        .await
        .expect("Failed to create test database");

    (temp_dir, Arc::new(store))
}

pub fn memory_store() -> Arc<dyn CheckpointStore> {
    Arc::new(InMemoryCheckpointStore::new())
}

/// A checkpoint with settings and a few scenes in mixed states
pub fn sample_checkpoint() -> ProjectCheckpoint {
    let mut checkpoint = ProjectCheckpoint::new();
    checkpoint.title = "Lighthouse".to_string();
    checkpoint.summary = "A keeper finds a message in a bottle.".to_string();
    checkpoint.art_style = "ink".to_string();
    checkpoint.protagonist = "Mara".to_string();
    checkpoint.workflow_state = WorkflowState::RefiningScenes;

    let mut first = Scene::new(1, "storm night");
    first.scene_description = Some("waves over rocks".to_string());
    first.action_description = Some("Mara climbs the stairs".to_string());
    first.shot_prompt = Some("low angle, lantern light".to_string());
    first.status = SceneStatus::Completed;

    let mut second = Scene::new(2, "the bottle");
    second.scene_description = Some("morning beach".to_string());
    second.status = SceneStatus::SceneConfirmed;

    let mut third = Scene::new(3, "the reply");
    third.status = SceneStatus::Error;
    third.error = Some("Provider error: 500".to_string());

    checkpoint.scenes = vec![first, second, third];
    checkpoint
}
