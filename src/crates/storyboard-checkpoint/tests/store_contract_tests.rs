//! Both backends must satisfy the same save/load/list/delete contract

mod common;

use common::{memory_store, sample_checkpoint, setup_sqlite_store};
use std::sync::Arc;
use std::time::Duration;
use storyboard_checkpoint::{CheckpointStore, ProjectCheckpoint, WorkflowState};

async fn assert_round_trip(store: Arc<dyn CheckpointStore>) {
    let checkpoint = sample_checkpoint();
    store.save(&checkpoint).await.unwrap();
    let first = store.load(&checkpoint.project_id).await.unwrap().unwrap();

    store.save(&first).await.unwrap();
    let second = store.load(&checkpoint.project_id).await.unwrap().unwrap();

    assert_eq!(second.scenes, checkpoint.scenes);
    assert_eq!(second.title, checkpoint.title);
    assert_eq!(second.workflow_state, checkpoint.workflow_state);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(first.created_at, checkpoint.created_at);
    assert!(second.updated_at >= first.updated_at);
}

async fn assert_list_by_recency(store: Arc<dyn CheckpointStore>) {
    let older = ProjectCheckpoint::new();
    let newer = ProjectCheckpoint::new();
    store.save(&older).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    store.save(&newer).await.unwrap();

    let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|c| c.project_id).collect();
    assert_eq!(ids, vec![newer.project_id.clone(), older.project_id.clone()]);

    tokio::time::sleep(Duration::from_millis(5)).await;
    store.save(&older).await.unwrap();
    let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|c| c.project_id).collect();
    assert_eq!(ids, vec![older.project_id, newer.project_id]);
}

async fn assert_last_writer_wins(store: Arc<dyn CheckpointStore>) {
    let checkpoint = ProjectCheckpoint::new();
    store.save(&checkpoint).await.unwrap();

    let mut first = checkpoint.clone();
    first.title = "first".to_string();
    let mut second = checkpoint.clone();
    second.title = "second".to_string();
    second.workflow_state = WorkflowState::CollectingBasicInfo;

    store.save(&first).await.unwrap();
    store.save(&second).await.unwrap();

    let loaded = store.load(&checkpoint.project_id).await.unwrap().unwrap();
    assert_eq!(loaded.title, "second");
    assert_eq!(store.list().await.unwrap().len(), 1);
}

async fn assert_delete(store: Arc<dyn CheckpointStore>) {
    let checkpoint = sample_checkpoint();
    store.save(&checkpoint).await.unwrap();
    store.delete(&checkpoint.project_id).await.unwrap();

    assert!(store.load(&checkpoint.project_id).await.unwrap().is_none());
    assert!(store.find_by_thread_id(&checkpoint.thread_id).await.unwrap().is_none());
    store.delete(&checkpoint.project_id).await.unwrap();
}

#[tokio::test]
async fn test_memory_round_trip() {
    assert_round_trip(memory_store()).await;
}

#[tokio::test]
async fn test_sqlite_round_trip() {
    let (_dir, store) = setup_sqlite_store().await;
    assert_round_trip(store).await;
}

#[tokio::test]
async fn test_memory_list_by_recency() {
    assert_list_by_recency(memory_store()).await;
}

#[tokio::test]
async fn test_sqlite_list_by_recency() {
    let (_dir, store) = setup_sqlite_store().await;
    assert_list_by_recency(store).await;
}

#[tokio::test]
async fn test_memory_last_writer_wins() {
    assert_last_writer_wins(memory_store()).await;
}

#[tokio::test]
async fn test_sqlite_last_writer_wins() {
    let (_dir, store) = setup_sqlite_store().await;
    assert_last_writer_wins(store).await;
}

#[tokio::test]
async fn test_memory_delete() {
    assert_delete(memory_store()).await;
}

#[tokio::test]
async fn test_sqlite_delete() {
    let (_dir, store) = setup_sqlite_store().await;
    assert_delete(store).await;
}

#[tokio::test]
async fn test_sqlite_thread_lookup_matches_scan() {
    let (_dir, store) = setup_sqlite_store().await;
    let checkpoint = sample_checkpoint();
    store.save(&checkpoint).await.unwrap();
    store.save(&ProjectCheckpoint::new()).await.unwrap();

    let indexed = store.find_by_thread_id(&checkpoint.thread_id).await.unwrap().unwrap();
    let scanned = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.thread_id == checkpoint.thread_id)
        .unwrap();
    assert_eq!(indexed, scanned);
}
