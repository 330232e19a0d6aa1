use super::{failure, parse_input, ToolContext};
use crate::error::Result;
use crate::result::ToolResult;
use crate::tool::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use storyboard_workflow::{current_step, ProjectCheckpoint, ProjectPatch};
use tracing::info;

fn snapshot(project: &ProjectCheckpoint) -> Value {
    json!({
        "projectId": project.project_id,
        "threadId": project.thread_id,
        "workflowState": project.workflow_state,
        "currentStep": current_step(project.workflow_state),
        "title": project.title,
        "summary": project.summary,
        "artStyle": project.art_style,
        "protagonist": project.protagonist,
        "scenesCount": project.scenes.len(),
        "scenes": project.scenes,
        "createdAt": project.created_at,
        "updatedAt": project.updated_at,
    })
}

#[derive(Debug, Deserialize)]
struct CreateProjectInput {
    title: Option<String>,
}

/// Create the session's project, or return the one already bound
pub struct CreateProjectTool {
    context: Arc<ToolContext>,
}

impl CreateProjectTool {
    pub(crate) fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for CreateProjectTool {
    fn name(&self) -> &str {
        "create_project"
    }

    fn description(&self) -> &str {
        "Create a new storyboard project, or continue the project already bound to this conversation"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "maxLength": self.context.options.limits.title_max,
                    "description": "Project title"
                }
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: CreateProjectInput = match parse_input(input) {
            Ok(input) => input,
            Err(result) => return Ok(result),
        };

        let existing = match self.context.resolve().await {
            Ok(existing) => existing,
            Err(e) => return failure(self.name(), e),
        };
        if let Some(project) = existing {
            self.context.bind(&project);
            let title = if project.title.is_empty() {
                input.title.unwrap_or_default()
            } else {
                project.title.clone()
            };
            info!(project_id = %project.project_id, "Reusing session project");
            return Ok(ToolResult::success(
                json!({
                    "projectId": project.project_id,
                    "threadId": project.thread_id,
                    "title": title,
                    "createdAt": project.created_at,
                    "reused": true,
                }),
                format!("Found existing project \"{}\", let's continue", title),
            ));
        }

        // A scope pinned to a project id that does not exist yet creates it under that id
        let project_id = self.context.scope.project_id();
        let thread_id = self.context.scope.thread_id();
        let project = match self
            .context
            .projects()
            .create_project_with_id(
                project_id.as_deref(),
                input.title.as_deref(),
                thread_id.as_deref(),
            )
            .await
        {
            Ok(project) => project,
            Err(e) => return failure(self.name(), e),
        };
        self.context.bind(&project);

        Ok(ToolResult::success(
            json!({
                "projectId": project.project_id,
                "threadId": project.thread_id,
                "title": project.title,
                "createdAt": project.created_at,
                "reused": false,
            }),
            format!(
                "Project \"{}\" created. Tell me the story summary, art style and protagonist",
                project.title
            ),
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetProjectStateInput {
    project_id: Option<String>,
}

/// Snapshot of a project; binds the scope to it
pub struct GetProjectStateTool {
    context: Arc<ToolContext>,
}

impl GetProjectStateTool {
    pub(crate) fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }

    async fn find(&self, project_id: Option<&str>) -> storyboard_workflow::Result<Option<ProjectCheckpoint>> {
        if let Some(project_id) = project_id {
            if let Some(project) = self.context.projects().get_project(project_id).await? {
                return Ok(Some(project));
            }
        }
        self.context.resolve().await
    }
}

#[async_trait]
impl Tool for GetProjectStateTool {
    fn name(&self) -> &str {
        "get_project_state"
    }

    fn description(&self) -> &str {
        "Get the current state of the project: settings, workflow state and scenes"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "projectId": {"type": "string", "description": "Project to load; defaults to the session project"}
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: GetProjectStateInput = match parse_input(input) {
            Ok(input) => input,
            Err(result) => return Ok(result),
        };

        match self.find(input.project_id.as_deref()).await {
            Ok(Some(project)) => {
                self.context.bind(&project);
                Ok(ToolResult::success(snapshot(&project), "Loaded project state"))
            }
            Ok(None) => Ok(ToolResult::failure("Project not found")),
            Err(e) => failure(self.name(), e),
        }
    }
}

/// Merge project settings
pub struct SetProjectInfoTool {
    context: Arc<ToolContext>,
}

impl SetProjectInfoTool {
    pub(crate) fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for SetProjectInfoTool {
    fn name(&self) -> &str {
        "set_project_info"
    }

    fn description(&self) -> &str {
        "Set or update the project's title, story summary, art style and protagonist"
    }

    fn input_schema(&self) -> Value {
        let limits = &self.context.options.limits;
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string", "maxLength": limits.title_max},
                "summary": {"type": "string", "maxLength": limits.summary_max},
                "artStyle": {"type": "string"},
                "protagonist": {"type": "string"}
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let patch: ProjectPatch = match parse_input(input) {
            Ok(patch) => patch,
            Err(result) => return Ok(result),
        };
        if patch.is_empty() {
            return Ok(ToolResult::failure(
                "Provide at least one of title, summary, artStyle or protagonist",
            ));
        }
        let fields = patch.provided_fields();

        let project = match self.context.require().await {
            Ok(project) => project,
            Err(e) => return failure(self.name(), e),
        };
        let project = match self.context.projects().update_project(&project.project_id, patch).await {
            Ok(project) => project,
            Err(e) => return failure(self.name(), e),
        };

        Ok(ToolResult::success(
            json!({
                "projectId": project.project_id,
                "threadId": project.thread_id,
                "workflowState": project.workflow_state,
                "title": project.title,
                "summary": project.summary,
                "artStyle": project.art_style,
                "protagonist": project.protagonist,
                "updatedFields": fields,
            }),
            format!("Updated project info: {}", fields.join(", ")),
        ))
    }
}
