//! Engine bootstrap
//!
//! Wires the checkpoint store, the generation provider, the project service
//! and the refinement pipeline from one [`StoryboardConfig`].

use crate::config::{ConfigLoader, StoryboardConfig};
use anyhow::{Context, Result};
use std::sync::Arc;
use storyboard_agent::{create_agent_tools, AgentToolOptions, ToolRegistry, ToolScope};
use storyboard_checkpoint::{create_store, CheckpointStore};
use storyboard_llm::LlmGenerator;
use storyboard_workflow::{GenerationService, ProjectService, RefinementPipeline};
use tracing::info;

pub struct Engine {
    config: StoryboardConfig,
    store: Arc<dyn CheckpointStore>,
    generator: Arc<dyn GenerationService>,
    pipeline: RefinementPipeline,
}

impl Engine {
    /// Load the layered configuration and build the engine
    pub async fn load() -> Result<Self> {
        let config = ConfigLoader::new()
            .load()
            .await
            .context("Failed to load configuration")?;
        Self::from_config(config).await
    }

    /// Build the engine with the configured LLM provider
    pub async fn from_config(config: StoryboardConfig) -> Result<Self> {
        let generator = LlmGenerator::new(config.llm.clone())
            .context("Failed to create LLM provider")?;
        Self::with_generator(config, Arc::new(generator)).await
    }

    /// Build the engine around a caller-supplied generator
    pub async fn with_generator(
        config: StoryboardConfig,
        generator: Arc<dyn GenerationService>,
    ) -> Result<Self> {
        config.validate()?;

        let store = create_store(&config.store)
            .await
            .with_context(|| format!("Failed to open {} checkpoint store", config.store.backend))?;

        let projects = ProjectService::new(store.clone()).with_limits(config.effective_limits());
        let pipeline = RefinementPipeline::new(projects, generator.clone())
            .with_timeout(config.generation.timeout());

        info!(
            backend = %config.store.backend,
            timeout_secs = config.generation.timeout_secs,
            "Storyboard engine ready"
        );

        Ok(Self {
            config,
            store,
            generator,
            pipeline,
        })
    }

    pub fn config(&self) -> &StoryboardConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Project operations for the wizard front-end
    pub fn projects(&self) -> &ProjectService {
        self.pipeline.projects()
    }

    pub fn pipeline(&self) -> &RefinementPipeline {
        &self.pipeline
    }

    pub fn tool_options(&self) -> AgentToolOptions {
        AgentToolOptions {
            generation_timeout: self.config.generation.timeout(),
            default_scene_count: self.config.generation.default_scene_count,
            limits: self.config.effective_limits(),
        }
    }

    /// Agent tools for one conversation session
    pub fn tools(&self, scope: ToolScope) -> ToolRegistry {
        create_agent_tools(
            self.store.clone(),
            self.generator.clone(),
            scope,
            self.tool_options(),
        )
    }
}
