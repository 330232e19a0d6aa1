//! Prompt construction and response parsing

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use storyboard_workflow::{SceneListContext, Stage, StageContext};

static NUMBERED_LINE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^\d+[.、:：]\s*(.+)$").expect("valid scene list pattern"));

const SYSTEM_PROMPT: &str = "You are a professional film storyboard artist and image-prompt engineer. \
You know narrative structure, visual composition and camera language, and you write \
high-quality prompts for image generators such as Midjourney or Stable Diffusion. \
Answer concisely with output that can be used directly.";

/// Chat message in the OpenAI wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Messages and completion budget for one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

impl PromptRequest {
    fn new(user: String, max_tokens: u32) -> Self {
        Self {
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)],
            max_tokens,
        }
    }
}

pub fn scene_list_prompt(context: &SceneListContext) -> PromptRequest {
    let project = &context.project;
    let user = format!(
        "Break the following story into {count} key storyboard scenes.\n\n\
         ## Story\n{summary}\n\n\
         ## Visual style\n{style}\n\n\
         ## Protagonist\n{protagonist}\n\n\
         Give each scene a short summary of one line, formatted as:\n\
         1. [scene summary]\n\
         2. [scene summary]\n\
         ...\n\n\
         The scenes should cover the whole arc of the story and each should be a single \
         picture or short sequence. Output only the list.",
        count = context.count,
        summary = project.summary,
        style = project.art_style,
        protagonist = project.protagonist,
    );
    PromptRequest::new(user, 1000)
}

pub fn stage_prompt(stage: Stage, context: &StageContext) -> PromptRequest {
    match stage {
        Stage::SceneDescription => scene_description_prompt(context),
        Stage::ActionDescription => action_description_prompt(context),
        Stage::ShotPrompt => shot_prompt_prompt(context),
    }
}

fn scene_description_prompt(context: &StageContext) -> PromptRequest {
    let project = &context.project;
    let mut user = format!(
        "Write a detailed scene description for the following storyboard scene.\n\n\
         ## Project\n\
         - Visual style: {style}\n\
         - Protagonist: {protagonist}\n\
         - Story: {story}\n\n\
         ## Current scene\n\
         Summary: {summary}\n",
        style = project.art_style,
        protagonist = project.protagonist,
        story = project.summary,
        summary = context.summary,
    );
    if let Some(previous) = &context.previous_summary {
        user.push_str(&format!("Previous scene: {}\n", previous));
    }
    user.push_str(
        "\nDescribe the setting (interior or exterior, location), lighting and mood, key props \
         and background elements, and suggested composition. Under 200 words.",
    );
    PromptRequest::new(user, 500)
}

fn action_description_prompt(context: &StageContext) -> PromptRequest {
    let user = format!(
        "Describe what the protagonist does in this scene.\n\n\
         ## Protagonist\n{protagonist}\n\n\
         ## Current scene\nSummary: {summary}\n\n\
         ## Confirmed scene description\n{scene}\n\n\
         Cover the main action and pose, facial expression and emotion, and interaction \
         with the environment. Under 150 words.",
        protagonist = context.project.protagonist,
        summary = context.summary,
        scene = context.scene_description.as_deref().unwrap_or_default(),
    );
    PromptRequest::new(user, 400)
}

fn shot_prompt_prompt(context: &StageContext) -> PromptRequest {
    let user = format!(
        "Write one high-quality image generation prompt from the scene and action below.\n\n\
         ## Visual style\n{style}\n\n\
         ## Scene description\n{scene}\n\n\
         ## Action description\n{action}\n\n\
         Include composition, shot type, lighting, color palette and quality keywords. \
         Keep it compact, in English, suitable for Stable Diffusion or Midjourney, ending \
         with common parameters such as --ar 16:9. Output only the prompt.",
        style = context.project.art_style,
        scene = context.scene_description.as_deref().unwrap_or_default(),
        action = context.action_description.as_deref().unwrap_or_default(),
    );
    PromptRequest::new(user, 500)
}

/// Extract scene summaries from a numbered list
///
/// Lines like `1. text`, `2、text` or `3：text` are taken with surrounding
/// brackets removed. When no line is numbered, every non-empty line is a
/// summary. At most `limit` summaries are returned when `limit` is non-zero.
pub fn parse_scene_list(response: &str, limit: usize) -> Vec<String> {
    let lines: Vec<&str> = response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let numbered: Vec<String> = lines
        .iter()
        .filter_map(|line| NUMBERED_LINE.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| strip_brackets(m.as_str())))
        .filter(|summary| !summary.is_empty())
        .collect();

    let mut scenes = if numbered.is_empty() {
        lines
            .into_iter()
            .map(strip_brackets)
            .filter(|summary| !summary.is_empty())
            .collect()
    } else {
        numbered
    };

    if limit > 0 {
        scenes.truncate(limit);
    }
    scenes
}

fn strip_brackets(s: &str) -> String {
    let s = s.trim();
    let s = s
        .strip_prefix('[')
        .or_else(|| s.strip_prefix('【'))
        .unwrap_or(s);
    let s = s
        .strip_suffix(']')
        .or_else(|| s.strip_suffix('】'))
        .unwrap_or(s);
    s.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyboard_workflow::{ProjectCheckpoint, ProjectContext, Scene};

    #[test]
    fn test_parse_numbered_variants() {
        let response = "Here you go:\n1. [Storm over the lighthouse]\n2、【瓶中信】\n3：The reply\n\n4: Dawn";
        assert_eq!(
            parse_scene_list(response, 0),
            vec!["Storm over the lighthouse", "瓶中信", "The reply", "Dawn"]
        );
    }

    #[test]
    fn test_parse_falls_back_to_lines() {
        let response = "Storm night\n\n  The bottle  \n[The reply]";
        assert_eq!(
            parse_scene_list(response, 0),
            vec!["Storm night", "The bottle", "The reply"]
        );
    }

    #[test]
    fn test_parse_respects_limit() {
        let response = "1. a\n2. b\n3. c";
        assert_eq!(parse_scene_list(response, 2), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_skips_empty_brackets() {
        assert_eq!(parse_scene_list("1. []\n2. real", 0), vec!["real"]);
        assert!(parse_scene_list("   \n", 0).is_empty());
    }

    #[test]
    fn test_scene_list_prompt_mentions_count_and_settings() {
        let context = SceneListContext {
            project: ProjectContext {
                title: "Lighthouse".to_string(),
                summary: "A keeper finds a bottle".to_string(),
                art_style: "ink wash".to_string(),
                protagonist: "Mara".to_string(),
            },
            count: 4,
        };
        let request = scene_list_prompt(&context);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[1].content.contains("into 4 key storyboard scenes"));
        assert!(request.messages[1].content.contains("ink wash"));
    }

    #[test]
    fn test_stage_prompts_carry_prior_stages() {
        let mut project = ProjectCheckpoint::new();
        let mut first = Scene::new(1, "calm");
        first.scene_description = Some("quiet harbor at dusk".to_string());
        first.action_description = Some("Mara lights the lamp".to_string());
        project.scenes = vec![Scene::new(0, "prologue"), first];
        let context = StageContext::for_scene(&project, &project.scenes[1]);

        let description = stage_prompt(Stage::SceneDescription, &context);
        assert!(description.messages[1].content.contains("Previous scene: prologue"));

        let shot = stage_prompt(Stage::ShotPrompt, &context);
        assert!(shot.messages[1].content.contains("quiet harbor at dusk"));
        assert!(shot.messages[1].content.contains("Mara lights the lamp"));
        assert_eq!(shot.max_tokens, 500);
    }
}
