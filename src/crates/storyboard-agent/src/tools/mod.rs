//! The storyboard tool set
//!
//! [`create_agent_tools`] builds a registry of seven tools sharing one
//! [`ToolScope`]:
//!
//! | Tool | Purpose |
//! |---|---|
//! | `create_project` | create or reuse the session's project |
//! | `get_project_state` | snapshot of the project |
//! | `set_project_info` | merge title, summary, art style, protagonist |
//! | `generate_scenes` | generate the scene list |
//! | `refine_scene` | refine one scene |
//! | `batch_refine_scenes` | refine several scenes concurrently |
//! | `export_prompts` | export completed scenes |
//!
//! Every tool reloads the checkpoint through the scope before mutating it.

mod export;
mod project;
mod scenes;

pub use export::ExportPromptsTool;
pub use project::{CreateProjectTool, GetProjectStateTool, SetProjectInfoTool};
pub use scenes::{BatchRefineScenesTool, GenerateScenesTool, RefineSceneTool};

use crate::error::Result;
use crate::result::ToolResult;
use crate::scope::ToolScope;
use crate::tool::ToolRegistry;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use storyboard_checkpoint::{CheckpointStore, ProjectCheckpoint};
use storyboard_workflow::{
    GenerationService, Limits, ProjectService, RefinementPipeline, WorkflowError,
    DEFAULT_GENERATION_TIMEOUT,
};
use tracing::warn;

/// Tool set configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentToolOptions {
    pub generation_timeout: Duration,
    /// Scene count when `generate_scenes` is called without one
    pub default_scene_count: usize,
    pub limits: Limits,
}

impl Default for AgentToolOptions {
    fn default() -> Self {
        Self {
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            default_scene_count: 5,
            limits: Limits::default(),
        }
    }
}

/// State shared by all tools of one registry
pub(crate) struct ToolContext {
    pub(crate) pipeline: RefinementPipeline,
    pub(crate) scope: ToolScope,
    pub(crate) options: AgentToolOptions,
}

impl ToolContext {
    pub(crate) fn projects(&self) -> &ProjectService {
        self.pipeline.projects()
    }

    /// Load the scope's project: by project id first, then by thread id
    pub(crate) async fn resolve(&self) -> storyboard_workflow::Result<Option<ProjectCheckpoint>> {
        let scope = self.scope.snapshot();
        let store = self.projects().store();

        if let Some(project_id) = &scope.project_id {
            if let Some(project) = store.load(project_id).await? {
                return Ok(Some(project));
            }
        }
        if let Some(thread_id) = &scope.thread_id {
            if let Some(project) = store.find_by_thread_id(thread_id).await? {
                return Ok(Some(project));
            }
        }
        Ok(None)
    }

    /// Resolve the scope's project and bind the scope to it
    pub(crate) async fn require(&self) -> storyboard_workflow::Result<ProjectCheckpoint> {
        let project = self.resolve().await?.ok_or_else(|| {
            WorkflowError::ProjectNotFound("No project in this session, create one first".to_string())
        })?;
        self.bind(&project);
        Ok(project)
    }

    pub(crate) fn bind(&self, project: &ProjectCheckpoint) {
        self.scope.bind(&project.project_id, &project.thread_id);
    }
}

/// Build the tool registry for one session
pub fn create_agent_tools(
    store: Arc<dyn CheckpointStore>,
    generator: Arc<dyn GenerationService>,
    scope: ToolScope,
    options: AgentToolOptions,
) -> ToolRegistry {
    let projects = ProjectService::new(store).with_limits(options.limits.clone());
    let pipeline = RefinementPipeline::new(projects, generator).with_timeout(options.generation_timeout);
    let context = Arc::new(ToolContext {
        pipeline,
        scope,
        options,
    });

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CreateProjectTool::new(context.clone())));
    registry.register(Box::new(GetProjectStateTool::new(context.clone())));
    registry.register(Box::new(SetProjectInfoTool::new(context.clone())));
    registry.register(Box::new(GenerateScenesTool::new(context.clone())));
    registry.register(Box::new(RefineSceneTool::new(context.clone())));
    registry.register(Box::new(BatchRefineScenesTool::new(context.clone())));
    registry.register(Box::new(ExportPromptsTool::new(context)));
    registry
}

/// Deserialize validated input into the tool's input type
pub(crate) fn parse_input<T: DeserializeOwned>(input: Value) -> std::result::Result<T, ToolResult> {
    serde_json::from_value(input).map_err(|e| ToolResult::failure(format!("Invalid input: {}", e)))
}

/// Report expected workflow failures as a failed result; persistence
/// failures stay errors
pub(crate) fn failure(tool: &str, err: WorkflowError) -> Result<ToolResult> {
    if err.is_recoverable() {
        warn!(tool = %tool, error = %err, "Tool failed");
        Ok(ToolResult::failure(err.to_string()))
    } else {
        Err(err.into())
    }
}
