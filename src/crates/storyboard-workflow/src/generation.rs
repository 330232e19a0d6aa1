//! Generation service seam
//!
//! The engine never talks to an LLM directly; it calls a
//! [`GenerationService`]. Providers implement the four single-shot
//! operations and get whole-scene refinement, batching and a degenerate
//! streaming mode for free. Every call made by the engine is bounded by
//! [`with_timeout`].

use crate::scene::{RefinedScene, Stage};
use crate::stream::{FragmentStream, StreamFragment};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use storyboard_checkpoint::{ProjectCheckpoint, Scene};
use thiserror::Error;

/// Default bound for a single generation call
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Result type for generation calls
pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Generation cancelled")]
    Cancelled,
}

/// Serializable non-streaming result shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<GenerationResult<String>> for GenerationOutcome {
    fn from(result: GenerationResult<String>) -> Self {
        match result {
            Ok(content) => Self {
                success: true,
                content: Some(content),
                error: None,
            },
            Err(e) => Self {
                success: false,
                content: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Project settings handed to every prompt
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    pub title: String,
    pub summary: String,
    pub art_style: String,
    pub protagonist: String,
}

impl From<&ProjectCheckpoint> for ProjectContext {
    fn from(project: &ProjectCheckpoint) -> Self {
        Self {
            title: project.title.clone(),
            summary: project.summary.clone(),
            art_style: project.art_style.clone(),
            protagonist: project.protagonist.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneListContext {
    pub project: ProjectContext,
    pub count: usize,
}

/// Everything a stage prompt can draw on for one scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageContext {
    pub project: ProjectContext,
    pub scene_id: String,
    pub order: u32,
    pub summary: String,
    pub scene_description: Option<String>,
    pub action_description: Option<String>,
    /// Summary of the scene immediately before this one
    pub previous_summary: Option<String>,
}

impl StageContext {
    pub fn for_scene(project: &ProjectCheckpoint, scene: &Scene) -> Self {
        let previous_summary = project
            .scenes
            .iter()
            .find(|s| s.order + 1 == scene.order)
            .map(|s| s.summary.clone());

        Self {
            project: ProjectContext::from(project),
            scene_id: scene.id.clone(),
            order: scene.order,
            summary: scene.summary.clone(),
            scene_description: scene.scene_description.clone(),
            action_description: scene.action_description.clone(),
            previous_summary,
        }
    }
}

/// External text generation
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Ordered scene summaries for a new scene list
    async fn generate_scene_list(&self, context: &SceneListContext) -> GenerationResult<Vec<String>>;

    async fn generate_scene_description(&self, context: &StageContext) -> GenerationResult<String>;

    async fn generate_action_description(&self, context: &StageContext) -> GenerationResult<String>;

    async fn generate_shot_prompt(&self, context: &StageContext) -> GenerationResult<String>;

    async fn generate_stage(&self, stage: Stage, context: &StageContext) -> GenerationResult<String> {
        match stage {
            Stage::SceneDescription => self.generate_scene_description(context).await,
            Stage::ActionDescription => self.generate_action_description(context).await,
            Stage::ShotPrompt => self.generate_shot_prompt(context).await,
        }
    }

    /// All three stages for one scene, each feeding the next
    async fn refine_scene(&self, context: &StageContext) -> GenerationResult<RefinedScene> {
        let mut context = context.clone();

        let scene_description = self.generate_scene_description(&context).await?;
        context.scene_description = Some(scene_description.clone());

        let action_description = self.generate_action_description(&context).await?;
        context.action_description = Some(action_description.clone());

        let shot_prompt = self.generate_shot_prompt(&context).await?;

        Ok(RefinedScene {
            scene_description,
            action_description,
            shot_prompt,
        })
    }

    /// Refine several scenes concurrently, reporting a result per scene id
    async fn batch_refine(
        &self,
        contexts: Vec<StageContext>,
    ) -> Vec<(String, GenerationResult<RefinedScene>)> {
        join_all(contexts.iter().map(|context| async move {
            (context.scene_id.clone(), self.refine_scene(context).await)
        }))
        .await
    }

    /// Streaming mode for one stage
    ///
    /// Providers without native streaming yield the whole result as a single
    /// fragment followed by the done sentinel.
    async fn stream_stage(&self, stage: Stage, context: &StageContext) -> GenerationResult<FragmentStream> {
        let content = self.generate_stage(stage, context).await?;
        Ok(Box::pin(futures::stream::iter(vec![
            Ok(StreamFragment::Text(content)),
            Ok(StreamFragment::Done),
        ])))
    }
}

/// Bound a generation call by `duration`
pub async fn with_timeout<T, F>(duration: Duration, operation: F) -> GenerationResult<T>
where
    F: Future<Output = GenerationResult<T>>,
{
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_elapsed) => Err(GenerationError::Timeout(duration)),
    }
}
