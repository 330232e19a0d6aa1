//! # storyboard-workflow - Storyboard Workflow Engine
//!
//! Drives a project from settings to exported image prompts:
//!
//! ```text
//! IDLE -> COLLECTING_BASIC_INFO -> BASIC_INFO_COMPLETE -> GENERATING_SCENES
//!      -> SCENE_LIST_EDITING -> SCENE_LIST_CONFIRMED -> REFINING_SCENES
//!      -> ALL_SCENES_COMPLETE -> EXPORTING -> EXPORTED
//! ```
//!
//! Each scene is refined in three gated stages (scene description, action
//! description, shot prompt). Text comes from a [`GenerationService`]; the
//! engine bounds every call with a timeout and restores the last good state
//! on failure or cancellation.
//!
//! ## Layout
//!
//! - [`workflow`] - state transitions and wizard-step mapping
//! - [`scene`] - per-scene stage gating and status lifecycle
//! - [`update`] - partial updates merged into checkpoints
//! - [`project`] - [`ProjectService`], CRUD over the checkpoint store
//! - [`pipeline`] - [`RefinementPipeline`], generation driven end to end
//! - [`stream`] - token accumulation with cancellation
//! - [`export`] - json, markdown and text renderings
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storyboard_checkpoint::InMemoryCheckpointStore;
//! use storyboard_workflow::{testing::MockGenerator, ProjectPatch, ProjectService, RefinementPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let projects = ProjectService::new(Arc::new(InMemoryCheckpointStore::new()));
//!     let project = projects.create_project(Some("Lighthouse"), None).await?;
//!     projects
//!         .update_project(
//!             &project.project_id,
//!             ProjectPatch {
//!                 summary: Some("A keeper finds a message in a bottle.".into()),
//!                 art_style: Some("ink wash".into()),
//!                 protagonist: Some("Mara".into()),
//!                 ..Default::default()
//!             },
//!         )
//!         .await?;
//!
//!     let pipeline = RefinementPipeline::new(projects, Arc::new(MockGenerator::new()));
//!     let project = pipeline.generate_scenes(&project.project_id, 3).await?;
//!     println!("{} scenes", project.scenes.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod export;
pub mod generation;
pub mod limits;
pub mod pipeline;
pub mod project;
pub mod scene;
pub mod stream;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod update;
pub mod workflow;

pub use error::{Result, WorkflowError};
pub use export::{full_prompt, render, ExportDocument, ExportFormat};
pub use generation::{
    with_timeout, GenerationError, GenerationOutcome, GenerationResult, GenerationService,
    ProjectContext, SceneListContext, StageContext, DEFAULT_GENERATION_TIMEOUT,
};
pub use limits::Limits;
pub use pipeline::{BatchReport, RefinementPipeline};
pub use project::{reorder, ProjectService};
pub use scene::{RefinedScene, SceneLifecycle, Stage};
pub use stream::{
    FragmentError, FragmentStream, StreamConsumer, StreamFragment, StreamOutcome, TokenBuffer,
};
pub use update::{apply_update, ProjectPatch, ScenePatch, Update};
pub use workflow::{current_step, set_state, WizardState, WorkflowStep};

pub use storyboard_checkpoint::{ProjectCheckpoint, Scene, SceneStatus, WorkflowState};
