//! Export of completed scenes
//!
//! Three formats:
//!
//! - `json` - structured document, optionally with project metadata
//! - `markdown` - readable storyboard with one section per scene
//! - `text` - prompts only, one block per scene separated by `---`
//!
//! Only completed scenes are exported, in presentation order. The full
//! image prompt of a scene is its shot prompt prefixed with the art style.

use crate::error::{Result, WorkflowError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use storyboard_checkpoint::{ProjectCheckpoint, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Markdown,
    Text,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Text => "text",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "text" | "txt" | "prompts" => Ok(ExportFormat::Text),
            other => Err(WorkflowError::Validation(format!("Unknown export format: {}", other))),
        }
    }
}

/// Rendered export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub format: ExportFormat,
    pub content: String,
    pub scenes_count: usize,
}

/// Art style and shot prompt combined into one image prompt
pub fn full_prompt(art_style: &str, scene: &Scene) -> String {
    let shot = scene.shot_prompt.as_deref().unwrap_or_default();
    if art_style.trim().is_empty() {
        shot.to_string()
    } else {
        format!("{}, {}", art_style.trim(), shot)
    }
}

/// Render the completed scenes of `project`
pub fn render(project: &ProjectCheckpoint, format: ExportFormat, include_metadata: bool) -> Result<ExportDocument> {
    let scenes = project.completed_scenes();
    if scenes.is_empty() {
        return Err(WorkflowError::Precondition(
            "No completed scenes to export".to_string(),
        ));
    }

    let content = match format {
        ExportFormat::Json => render_json(project, &scenes, include_metadata)?,
        ExportFormat::Markdown => render_markdown(project, &scenes, include_metadata),
        ExportFormat::Text => render_text(project, &scenes),
    };

    Ok(ExportDocument {
        format,
        content,
        scenes_count: scenes.len(),
    })
}

fn render_json(project: &ProjectCheckpoint, scenes: &[&Scene], include_metadata: bool) -> Result<String> {
    let scenes: Vec<_> = scenes
        .iter()
        .map(|scene| {
            json!({
                "order": scene.order,
                "summary": scene.summary,
                "sceneDescription": scene.scene_description,
                "actionDescription": scene.action_description,
                "shotPrompt": scene.shot_prompt,
                "fullPrompt": full_prompt(&project.art_style, scene),
            })
        })
        .collect();

    let mut document = json!({
        "title": project.title,
        "summary": project.summary,
        "artStyle": project.art_style,
        "protagonist": project.protagonist,
        "scenes": scenes,
    });

    if include_metadata {
        document["metadata"] = json!({
            "projectId": project.project_id,
            "threadId": project.thread_id,
            "workflowState": project.workflow_state,
            "exportedAt": Utc::now().to_rfc3339(),
        });
    }

    serde_json::to_string_pretty(&document)
        .map_err(|e| WorkflowError::Validation(format!("Failed to render export: {}", e)))
}

fn render_markdown(project: &ProjectCheckpoint, scenes: &[&Scene], include_metadata: bool) -> String {
    let mut out = format!("# {}\n\n", project.title);
    out.push_str(&format!("- **Art style:** {}\n", project.art_style));
    out.push_str(&format!("- **Protagonist:** {}\n", project.protagonist));
    if include_metadata {
        out.push_str(&format!("- **Project:** {}\n", project.project_id));
        out.push_str(&format!("- **Exported:** {}\n", Utc::now().to_rfc3339()));
    }
    out.push_str(&format!("\n{}\n", project.summary));

    for scene in scenes {
        out.push_str(&format!("\n## Scene {}: {}\n\n", scene.order, scene.summary));
        out.push_str(&format!(
            "**Scene description**\n\n{}\n\n",
            scene.scene_description.as_deref().unwrap_or_default()
        ));
        out.push_str(&format!(
            "**Action description**\n\n{}\n\n",
            scene.action_description.as_deref().unwrap_or_default()
        ));
        out.push_str(&format!(
            "**Shot prompt**\n\n```\n{}\n```\n",
            full_prompt(&project.art_style, scene)
        ));
    }
    out
}

fn render_text(project: &ProjectCheckpoint, scenes: &[&Scene]) -> String {
    scenes
        .iter()
        .map(|scene| {
            format!(
                "[Scene {}] {}\n{}",
                scene.order,
                scene.summary,
                full_prompt(&project.art_style, scene)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyboard_checkpoint::SceneStatus;

    fn project() -> ProjectCheckpoint {
        let mut project = ProjectCheckpoint::new();
        project.title = "Lighthouse".to_string();
        project.art_style = "ink wash".to_string();

        let mut done = Scene::new(2, "storm");
        done.scene_description = Some("waves".to_string());
        done.action_description = Some("climbs".to_string());
        done.shot_prompt = Some("low angle".to_string());
        done.status = SceneStatus::Completed;

        let mut first = done.clone();
        first.id = "scene-first".to_string();
        first.order = 1;
        first.summary = "calm".to_string();

        project.scenes = vec![done, Scene::new(3, "pending"), first];
        project
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_requires_completed_scene() {
        let mut project = project();
        project.scenes.retain(|s| !s.is_completed());
        assert!(render(&project, ExportFormat::Json, false).is_err());
    }

    #[test]
    fn test_json_export_only_completed_in_order() {
        let document = render(&project(), ExportFormat::Json, false).unwrap();
        assert_eq!(document.scenes_count, 2);

        let value: serde_json::Value = serde_json::from_str(&document.content).unwrap();
        assert_eq!(value["scenes"][0]["summary"], "calm");
        assert_eq!(value["scenes"][1]["fullPrompt"], "ink wash, low angle");
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn test_json_export_with_metadata() {
        let project = project();
        let document = render(&project, ExportFormat::Json, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&document.content).unwrap();
        assert_eq!(value["metadata"]["projectId"], project.project_id.as_str());
    }

    #[test]
    fn test_text_export_blocks() {
        let document = render(&project(), ExportFormat::Text, false).unwrap();
        assert_eq!(
            document.content,
            "[Scene 1] calm\nink wash, low angle\n\n---\n\n[Scene 2] storm\nink wash, low angle"
        );
    }

    #[test]
    fn test_markdown_export_sections() {
        let document = render(&project(), ExportFormat::Markdown, false).unwrap();
        assert!(document.content.starts_with("# Lighthouse\n"));
        assert!(document.content.contains("## Scene 1: calm"));
        assert!(!document.content.contains("pending"));
    }

    #[test]
    fn test_full_prompt_without_style() {
        let mut scene = Scene::new(1, "s");
        scene.shot_prompt = Some("close-up".to_string());
        assert_eq!(full_prompt("  ", &scene), "close-up");
    }
}
