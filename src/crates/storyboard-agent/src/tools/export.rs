use super::{failure, parse_input, ToolContext};
use crate::error::Result;
use crate::result::ToolResult;
use crate::tool::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use storyboard_workflow::ExportFormat;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportPromptsInput {
    #[serde(default)]
    format: ExportFormat,
    #[serde(default)]
    include_metadata: bool,
}

/// Export the completed scenes
pub struct ExportPromptsTool {
    context: Arc<ToolContext>,
}

impl ExportPromptsTool {
    pub(crate) fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for ExportPromptsTool {
    fn name(&self) -> &str {
        "export_prompts"
    }

    fn description(&self) -> &str {
        "Export the prompts of all completed scenes as json, markdown or text"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "format": {"type": "string", "enum": ["json", "markdown", "text"]},
                "includeMetadata": {"type": "boolean"}
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: ExportPromptsInput = match parse_input(input) {
            Ok(input) => input,
            Err(result) => return Ok(result),
        };

        let project = match self.context.require().await {
            Ok(project) => project,
            Err(e) => return failure(self.name(), e),
        };
        let document = match self
            .context
            .projects()
            .export_prompts(&project.project_id, input.format, input.include_metadata)
            .await
        {
            Ok(document) => document,
            Err(e) => return failure(self.name(), e),
        };

        Ok(ToolResult::success(
            json!({
                "projectId": project.project_id,
                "threadId": project.thread_id,
                "format": document.format,
                "includeMetadata": input.include_metadata,
                "content": document.content,
                "scenesCount": document.scenes_count,
            }),
            format!(
                "Exported {} scenes as {}",
                document.scenes_count, document.format
            ),
        ))
    }
}
