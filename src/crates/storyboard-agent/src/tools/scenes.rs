use super::{failure, parse_input, ToolContext};
use crate::error::Result;
use crate::result::ToolResult;
use crate::tool::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use storyboard_workflow::full_prompt;

#[derive(Debug, Deserialize)]
struct GenerateScenesInput {
    count: Option<usize>,
}

/// Generate the scene list from the project settings
pub struct GenerateScenesTool {
    context: Arc<ToolContext>,
}

impl GenerateScenesTool {
    pub(crate) fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for GenerateScenesTool {
    fn name(&self) -> &str {
        "generate_scenes"
    }

    fn description(&self) -> &str {
        "Break the story summary into a list of storyboard scenes"
    }

    fn input_schema(&self) -> Value {
        let limits = &self.context.options.limits;
        json!({
            "type": "object",
            "properties": {
                "count": {
                    "type": "integer",
                    "minimum": limits.scene_count_min,
                    "maximum": limits.scene_count_max,
                    "description": "Number of scenes to generate"
                }
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: GenerateScenesInput = match parse_input(input) {
            Ok(input) => input,
            Err(result) => return Ok(result),
        };
        let count = input.count.unwrap_or(self.context.options.default_scene_count);

        let project = match self.context.require().await {
            Ok(project) => project,
            Err(e) => return failure(self.name(), e),
        };
        let project = match self.context.pipeline.generate_scenes(&project.project_id, count).await {
            Ok(project) => project,
            Err(e) => return failure(self.name(), e),
        };

        Ok(ToolResult::success(
            json!({
                "projectId": project.project_id,
                "threadId": project.thread_id,
                "workflowState": project.workflow_state,
                "scenes": project.scenes,
            }),
            format!(
                "Generated {} scenes, review them before refining",
                project.scenes.len()
            ),
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefineSceneInput {
    scene_id: String,
}

/// Refine one scene through all three stages
pub struct RefineSceneTool {
    context: Arc<ToolContext>,
}

impl RefineSceneTool {
    pub(crate) fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for RefineSceneTool {
    fn name(&self) -> &str {
        "refine_scene"
    }

    fn description(&self) -> &str {
        "Refine one scene into a scene description, an action description and a shot prompt"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sceneId": {"type": "string", "minLength": 1}
            },
            "required": ["sceneId"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: RefineSceneInput = match parse_input(input) {
            Ok(input) => input,
            Err(result) => return Ok(result),
        };

        let project = match self.context.require().await {
            Ok(project) => project,
            Err(e) => return failure(self.name(), e),
        };
        let project = match self
            .context
            .pipeline
            .refine_scene(&project.project_id, &input.scene_id)
            .await
        {
            Ok(project) => project,
            Err(e) => return failure(self.name(), e),
        };
        let Some(scene) = project.scene(&input.scene_id) else {
            return Ok(ToolResult::failure(format!("Scene not found: {}", input.scene_id)));
        };

        Ok(ToolResult::success(
            json!({
                "projectId": project.project_id,
                "threadId": project.thread_id,
                "workflowState": project.workflow_state,
                "sceneId": scene.id,
                "sceneDescription": scene.scene_description,
                "actionDescription": scene.action_description,
                "shotPrompt": scene.shot_prompt,
                "fullPrompt": full_prompt(&project.art_style, scene),
                "status": scene.status,
            }),
            format!("Scene {} refined", scene.order),
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchRefineInput {
    scene_ids: Vec<String>,
}

/// Refine several scenes concurrently with a single final save
pub struct BatchRefineScenesTool {
    context: Arc<ToolContext>,
}

impl BatchRefineScenesTool {
    pub(crate) fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for BatchRefineScenesTool {
    fn name(&self) -> &str {
        "batch_refine_scenes"
    }

    fn description(&self) -> &str {
        "Refine several scenes at once"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sceneIds": {
                    "type": "array",
                    "items": {"type": "string"},
                    "minItems": 1
                }
            },
            "required": ["sceneIds"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: BatchRefineInput = match parse_input(input) {
            Ok(input) => input,
            Err(result) => return Ok(result),
        };

        let project = match self.context.require().await {
            Ok(project) => project,
            Err(e) => return failure(self.name(), e),
        };
        let report = match self
            .context
            .pipeline
            .batch_refine(&project.project_id, &input.scene_ids)
            .await
        {
            Ok(report) => report,
            Err(e) => return failure(self.name(), e),
        };

        let failed: Vec<Value> = report
            .failed
            .iter()
            .map(|(id, error)| json!({"sceneId": id, "error": error}))
            .collect();

        if report.refined.is_empty() {
            let reasons: Vec<String> = report
                .failed
                .iter()
                .map(|(id, error)| format!("{}: {}", id, error))
                .collect();
            return Ok(ToolResult::failure(format!(
                "No scenes were refined ({})",
                reasons.join("; ")
            )));
        }

        let project = &report.project;
        let results: Vec<Value> = report
            .refined
            .iter()
            .filter_map(|id| project.scene(id))
            .map(|scene| {
                json!({
                    "sceneId": scene.id,
                    "sceneDescription": scene.scene_description,
                    "actionDescription": scene.action_description,
                    "shotPrompt": scene.shot_prompt,
                    "fullPrompt": full_prompt(&project.art_style, scene),
                })
            })
            .collect();

        Ok(ToolResult::success(
            json!({
                "projectId": project.project_id,
                "threadId": project.thread_id,
                "workflowState": project.workflow_state,
                "results": results,
                "failed": failed,
                "missing": report.missing,
            }),
            format!(
                "Refined {} of {} scenes",
                report.refined.len(),
                report.refined.len() + report.failed.len()
            ),
        ))
    }
}
