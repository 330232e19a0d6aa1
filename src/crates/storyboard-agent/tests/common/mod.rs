//! Common test utilities and setup

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use storyboard_agent::{create_agent_tools, AgentToolOptions, ToolRegistry, ToolScope};
use storyboard_checkpoint::{CheckpointStore, InMemoryCheckpointStore, SqliteCheckpointStore};
use storyboard_workflow::testing::MockGenerator;
use tempfile::TempDir;

static TEST_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub async fn setup_sqlite_store() -> (TempDir, Arc<dyn CheckpointStore>) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let counter = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let db_path = temp_dir.path().join(format!("agent_{}.db", counter));

    let store = SqliteCheckpointStore::connect(&db_path)
        .await
        .expect("Failed to create test database");

    (temp_dir, Arc::new(store))
}

pub fn memory_store() -> Arc<dyn CheckpointStore> {
    Arc::new(InMemoryCheckpointStore::new())
}

/// Tools for one session over `store`
pub fn session(
    store: Arc<dyn CheckpointStore>,
    generator: MockGenerator,
    scope: ToolScope,
) -> ToolRegistry {
    create_agent_tools(store, Arc::new(generator), scope, AgentToolOptions::default())
}
