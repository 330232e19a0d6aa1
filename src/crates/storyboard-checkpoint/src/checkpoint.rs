//! Project checkpoint model
//!
//! A [`ProjectCheckpoint`] is the full persisted snapshot of one storyboard
//! project: basic settings, the workflow state and the ordered scene list.
//! The serialized form (camelCase JSON) is the durable schema shared by every
//! backend:
//!
//! ```text
//! {projectId, threadId, workflowState, title, summary, artStyle, protagonist,
//!  scenes: [{id, order, summary, status, sceneDescription?, keyframePrompt?,
//!            spatialPrompt?, error?}],
//!  createdAt, updatedAt}
//! ```
//!
//! Older payloads written by the wizard front-end are accepted on input:
//! wizard state names deserialize into their canonical counterparts,
//! `style` is read as `artStyle`, `actionDescription` as `keyframePrompt` and
//! `shotPrompt` as `spatialPrompt`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Project-level workflow state, in progression order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    #[default]
    Idle,
    #[serde(alias = "DATA_COLLECTING")]
    CollectingBasicInfo,
    #[serde(alias = "DATA_COLLECTED")]
    BasicInfoComplete,
    #[serde(alias = "SCENE_LIST_GENERATING")]
    GeneratingScenes,
    SceneListEditing,
    SceneListConfirmed,
    #[serde(alias = "SCENE_PROCESSING")]
    RefiningScenes,
    AllScenesComplete,
    Exporting,
    Exported,
}

impl WorkflowState {
    /// Every state, in progression order
    pub const ALL: [WorkflowState; 10] = [
        WorkflowState::Idle,
        WorkflowState::CollectingBasicInfo,
        WorkflowState::BasicInfoComplete,
        WorkflowState::GeneratingScenes,
        WorkflowState::SceneListEditing,
        WorkflowState::SceneListConfirmed,
        WorkflowState::RefiningScenes,
        WorkflowState::AllScenesComplete,
        WorkflowState::Exporting,
        WorkflowState::Exported,
    ];

    /// Position of the state in the progression (0-based)
    pub fn rank(&self) -> u8 {
        match self {
            WorkflowState::Idle => 0,
            WorkflowState::CollectingBasicInfo => 1,
            WorkflowState::BasicInfoComplete => 2,
            WorkflowState::GeneratingScenes => 3,
            WorkflowState::SceneListEditing => 4,
            WorkflowState::SceneListConfirmed => 5,
            WorkflowState::RefiningScenes => 6,
            WorkflowState::AllScenesComplete => 7,
            WorkflowState::Exporting => 8,
            WorkflowState::Exported => 9,
        }
    }

    /// States that only exist while an operation is in flight
    pub fn is_transient(&self) -> bool {
        matches!(self, WorkflowState::GeneratingScenes | WorkflowState::Exporting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "IDLE",
            WorkflowState::CollectingBasicInfo => "COLLECTING_BASIC_INFO",
            WorkflowState::BasicInfoComplete => "BASIC_INFO_COMPLETE",
            WorkflowState::GeneratingScenes => "GENERATING_SCENES",
            WorkflowState::SceneListEditing => "SCENE_LIST_EDITING",
            WorkflowState::SceneListConfirmed => "SCENE_LIST_CONFIRMED",
            WorkflowState::RefiningScenes => "REFINING_SCENES",
            WorkflowState::AllScenesComplete => "ALL_SCENES_COMPLETE",
            WorkflowState::Exporting => "EXPORTING",
            WorkflowState::Exported => "EXPORTED",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("Unknown workflow state: {}", s))
    }
}

/// Per-scene generation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    #[default]
    Pending,
    /// Whole-scene refinement in flight
    InProgress,
    SceneGenerating,
    SceneConfirmed,
    ActionGenerating,
    #[serde(alias = "keyframe_confirmed")]
    ActionConfirmed,
    PromptGenerating,
    Completed,
    /// Upstream content changed after downstream stages were generated
    NeedsUpdate,
    Error,
}

impl SceneStatus {
    /// True while a generation call for the scene is in flight
    pub fn is_generating(&self) -> bool {
        matches!(
            self,
            SceneStatus::InProgress
                | SceneStatus::SceneGenerating
                | SceneStatus::ActionGenerating
                | SceneStatus::PromptGenerating
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SceneStatus::Pending => "pending",
            SceneStatus::InProgress => "in_progress",
            SceneStatus::SceneGenerating => "scene_generating",
            SceneStatus::SceneConfirmed => "scene_confirmed",
            SceneStatus::ActionGenerating => "action_generating",
            SceneStatus::ActionConfirmed => "action_confirmed",
            SceneStatus::PromptGenerating => "prompt_generating",
            SceneStatus::Completed => "completed",
            SceneStatus::NeedsUpdate => "needs_update",
            SceneStatus::Error => "error",
        }
    }
}

impl fmt::Display for SceneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single storyboard scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,

    /// 1-based position within the project
    pub order: u32,

    pub summary: String,

    pub status: SceneStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_description: Option<String>,

    /// Action / keyframe description (second stage)
    #[serde(
        default,
        rename = "keyframePrompt",
        alias = "actionDescription",
        skip_serializing_if = "Option::is_none"
    )]
    pub action_description: Option<String>,

    /// Shot / spatial prompt (third stage)
    #[serde(
        default,
        rename = "spatialPrompt",
        alias = "shotPrompt",
        skip_serializing_if = "Option::is_none"
    )]
    pub shot_prompt: Option<String>,

    /// Message from the last failed generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Scene {
    /// Create a pending scene with a fresh id
    pub fn new(order: u32, summary: impl Into<String>) -> Self {
        Self {
            id: format!("scene-{}", Uuid::new_v4()),
            order,
            summary: summary.into(),
            status: SceneStatus::Pending,
            scene_description: None,
            action_description: None,
            shot_prompt: None,
            error: None,
        }
    }

    pub fn has_scene_description(&self) -> bool {
        is_filled(&self.scene_description)
    }

    pub fn has_action_description(&self) -> bool {
        is_filled(&self.action_description)
    }

    pub fn has_shot_prompt(&self) -> bool {
        is_filled(&self.shot_prompt)
    }

    pub fn is_completed(&self) -> bool {
        self.status == SceneStatus::Completed
    }
}

fn is_filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Full persisted snapshot of one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCheckpoint {
    pub project_id: String,
    pub thread_id: String,
    #[serde(default)]
    pub workflow_state: WorkflowState,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, alias = "style")]
    pub art_style: String,
    #[serde(default)]
    pub protagonist: String,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectCheckpoint {
    /// Create an empty checkpoint in `IDLE`
    pub fn empty(project_id: impl Into<String>, thread_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            project_id: project_id.into(),
            thread_id: thread_id.into(),
            workflow_state: WorkflowState::Idle,
            title: String::new(),
            summary: String::new(),
            art_style: String::new(),
            protagonist: String::new(),
            scenes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an empty checkpoint with freshly generated project and thread ids
    pub fn new() -> Self {
        Self::empty(new_project_id(), new_thread_id())
    }

    /// True when title, summary, art style and protagonist are all set
    pub fn has_basic_info(&self) -> bool {
        [&self.title, &self.summary, &self.art_style, &self.protagonist]
            .iter()
            .all(|v| !v.trim().is_empty())
    }

    pub fn scene(&self, scene_id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == scene_id)
    }

    pub fn scene_mut(&mut self, scene_id: &str) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| s.id == scene_id)
    }

    /// Completed scenes in presentation order
    pub fn completed_scenes(&self) -> Vec<&Scene> {
        let mut completed: Vec<&Scene> = self.scenes.iter().filter(|s| s.is_completed()).collect();
        completed.sort_by_key(|s| s.order);
        completed
    }

    /// True when the project has scenes and every one of them is completed
    pub fn all_scenes_completed(&self) -> bool {
        !self.scenes.is_empty() && self.scenes.iter().all(Scene::is_completed)
    }

    /// Sort scenes by `order` and reassign a contiguous 1-based sequence
    pub fn renumber_scenes(&mut self) {
        self.scenes.sort_by_key(|s| s.order);
        for (index, scene) in self.scenes.iter_mut().enumerate() {
            scene.order = index as u32 + 1;
        }
    }
}

impl Default for ProjectCheckpoint {
    fn default() -> Self {
        Self::new()
    }
}

pub fn new_project_id() -> String {
    format!("project-{}", Uuid::new_v4())
}

pub fn new_thread_id() -> String {
    format!("thread-{}", Uuid::new_v4())
}
