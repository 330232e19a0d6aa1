//! # storyboard-checkpoint - Project State Persistence
//!
//! Checkpoint model and storage backends for the storyboard workflow engine.
//! A checkpoint is the full snapshot of one project: settings, workflow
//! state and scenes. The store exclusively owns persisted state; anything
//! held in memory by callers is a cache to be reloaded before mutation.
//!
//! ## Backends
//!
//! - [`InMemoryCheckpointStore`] - process-lifetime map for tests and
//!   ephemeral sessions
//! - [`SqliteCheckpointStore`] - durable embedded database via sqlx
//!
//! Both implement [`CheckpointStore`] with identical upsert semantics, and
//! [`create_store`] picks one from a [`StoreConfig`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storyboard_checkpoint::{create_store, ProjectCheckpoint, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = create_store(&StoreConfig::sqlite("data/storyboard.db")).await?;
//!
//!     let checkpoint = ProjectCheckpoint::new();
//!     let id = store.save(&checkpoint).await?;
//!     let loaded = store.load(&id).await?;
//!     assert!(loaded.is_some());
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod error;
pub mod factory;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use checkpoint::{
    new_project_id, new_thread_id, ProjectCheckpoint, Scene, SceneStatus, WorkflowState,
};
pub use error::{CheckpointError, Result};
pub use factory::{create_store, StoreBackend, StoreConfig};
pub use memory::InMemoryCheckpointStore;
pub use sqlite::SqliteCheckpointStore;
pub use traits::CheckpointStore;
