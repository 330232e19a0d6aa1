//! Test infrastructure shared by the workspace
//!
//! [`MockGenerator`] is a deterministic [`GenerationService`] whose failures
//! and latency are configured up front.

use crate::generation::{
    GenerationError, GenerationResult, GenerationService, SceneListContext, StageContext,
};
use crate::scene::Stage;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Deterministic generator for tests
///
/// Stage outputs are `"{stage} for {summary}"`; the scene list is either the
/// configured summaries or `Scene 1..=count`.
#[derive(Debug, Default)]
pub struct MockGenerator {
    scene_list: Option<Vec<String>>,
    fail_scene_list: bool,
    failing_scenes: HashSet<String>,
    failing_stage: Option<Stage>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return exactly these summaries from scene-list generation
    pub fn with_scene_list<I, S>(mut self, summaries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scene_list = Some(summaries.into_iter().map(Into::into).collect());
        self
    }

    pub fn fail_scene_list(mut self) -> Self {
        self.fail_scene_list = true;
        self
    }

    /// Fail every stage for scenes with this summary
    pub fn fail_scene(mut self, summary: impl Into<String>) -> Self {
        self.failing_scenes.insert(summary.into());
        self
    }

    /// Fail one stage for every scene
    pub fn fail_stage(mut self, stage: Stage) -> Self {
        self.failing_stage = Some(stage);
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of generation calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer(&self, stage: Stage, context: &StageContext) -> GenerationResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_scenes.contains(&context.summary) || self.failing_stage == Some(stage) {
            return Err(GenerationError::Provider(format!(
                "mock failure for {} of '{}'",
                stage, context.summary
            )));
        }
        Ok(format!("{} for {}", stage, context.summary))
    }
}

#[async_trait]
impl GenerationService for MockGenerator {
    async fn generate_scene_list(&self, context: &SceneListContext) -> GenerationResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_scene_list {
            return Err(GenerationError::Provider("mock scene list failure".to_string()));
        }
        Ok(match &self.scene_list {
            Some(summaries) => summaries.clone(),
            None => (1..=context.count).map(|n| format!("Scene {}", n)).collect(),
        })
    }

    async fn generate_scene_description(&self, context: &StageContext) -> GenerationResult<String> {
        self.answer(Stage::SceneDescription, context).await
    }

    async fn generate_action_description(&self, context: &StageContext) -> GenerationResult<String> {
        self.answer(Stage::ActionDescription, context).await
    }

    async fn generate_shot_prompt(&self, context: &StageContext) -> GenerationResult<String> {
        self.answer(Stage::ShotPrompt, context).await
    }
}
