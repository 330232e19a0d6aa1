//! [`GenerationService`] backed by a [`ChatBackend`]

use crate::backend::{backend_for, ChatBackend};
use crate::config::LlmConfig;
use crate::error::Result;
use crate::prompts::{parse_scene_list, scene_list_prompt, stage_prompt, PromptRequest};
use async_trait::async_trait;
use std::sync::Arc;
use storyboard_workflow::{
    FragmentStream, GenerationError, GenerationResult, GenerationService, SceneListContext, Stage,
    StageContext,
};
use tracing::{debug, info};

#[derive(Clone)]
pub struct LlmGenerator {
    backend: Arc<dyn ChatBackend>,
}

impl LlmGenerator {
    /// Generator for the configured provider
    pub fn new(config: LlmConfig) -> Result<Self> {
        info!(provider = %config.provider, model = %config.effective_model(), "Using LLM provider");
        Ok(Self::from_backend(backend_for(config)?))
    }

    pub fn from_backend(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }

    async fn run(&self, request: PromptRequest) -> GenerationResult<String> {
        let content = self
            .backend
            .complete(&request.messages, request.max_tokens)
            .await?;
        let content = content.trim();
        if content.is_empty() {
            return Err(GenerationError::InvalidResponse("Empty completion".to_string()));
        }
        Ok(content.to_string())
    }
}

#[async_trait]
impl GenerationService for LlmGenerator {
    async fn generate_scene_list(&self, context: &SceneListContext) -> GenerationResult<Vec<String>> {
        let text = self.run(scene_list_prompt(context)).await?;
        let scenes = parse_scene_list(&text, context.count);
        if scenes.is_empty() {
            return Err(GenerationError::InvalidResponse(
                "No scenes found in completion".to_string(),
            ));
        }
        info!(requested = context.count, parsed = scenes.len(), "Parsed scene list");
        Ok(scenes)
    }

    async fn generate_scene_description(&self, context: &StageContext) -> GenerationResult<String> {
        self.generate_stage(Stage::SceneDescription, context).await
    }

    async fn generate_action_description(&self, context: &StageContext) -> GenerationResult<String> {
        self.generate_stage(Stage::ActionDescription, context).await
    }

    async fn generate_shot_prompt(&self, context: &StageContext) -> GenerationResult<String> {
        self.generate_stage(Stage::ShotPrompt, context).await
    }

    async fn generate_stage(&self, stage: Stage, context: &StageContext) -> GenerationResult<String> {
        debug!(scene_id = %context.scene_id, stage = %stage, "Generating stage");
        self.run(stage_prompt(stage, context)).await
    }

    async fn stream_stage(&self, stage: Stage, context: &StageContext) -> GenerationResult<FragmentStream> {
        debug!(scene_id = %context.scene_id, stage = %stage, "Streaming stage");
        let request = stage_prompt(stage, context);
        Ok(self
            .backend
            .complete_stream(&request.messages, request.max_tokens)
            .await?)
    }
}
