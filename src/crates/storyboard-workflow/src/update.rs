//! Pure state updates
//!
//! [`apply_update`] takes the current checkpoint and an [`Update`] and
//! returns the next checkpoint without touching storage. The update kinds
//! are explicit:
//!
//! - [`Update::Project`] - shallow merge of the provided, non-empty settings
//! - [`Update::ReplaceScenes`] - swap the whole scene list (re-numbered 1..N)
//! - [`Update::Scene`] - patch one scene by id
//! - [`Update::Workflow`] - set the workflow state, checked by [`set_state`]
//!
//! Scene updates keep the stage-gating invariant and re-run the derived
//! completion transition.

use crate::error::{Result, WorkflowError};
use crate::scene::SceneLifecycle;
use crate::workflow::{reconcile_completion, set_state};
use serde::{Deserialize, Serialize};
use storyboard_checkpoint::{ProjectCheckpoint, Scene, SceneStatus, WorkflowState};

/// Partial project settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, alias = "style", skip_serializing_if = "Option::is_none")]
    pub art_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protagonist: Option<String>,
}

impl ProjectPatch {
    /// Names of the fields this patch will actually set
    pub fn provided_fields(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("summary", &self.summary),
            ("artStyle", &self.art_style),
            ("protagonist", &self.protagonist),
        ]
        .into_iter()
        .filter(|(_, value)| non_empty(value).is_some())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.provided_fields().is_empty()
    }
}

/// Partial scene content
///
/// `Some("")` clears a content field. Without an explicit `status` the
/// status follows the content: editing a field whose downstream stages are
/// already generated marks the scene `needs_update`, otherwise the scene
/// settles on its last confirmed stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_description: Option<String>,
    #[serde(default, alias = "keyframePrompt", skip_serializing_if = "Option::is_none")]
    pub action_description: Option<String>,
    #[serde(default, alias = "spatialPrompt", skip_serializing_if = "Option::is_none")]
    pub shot_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SceneStatus>,
}

/// A single state change
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Project(ProjectPatch),
    ReplaceScenes(Vec<Scene>),
    Scene { id: String, patch: ScenePatch },
    Workflow(WorkflowState),
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn content(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Apply `update` to `current`, returning the next checkpoint
pub fn apply_update(current: &ProjectCheckpoint, update: Update) -> Result<ProjectCheckpoint> {
    let mut next = current.clone();

    match update {
        Update::Project(patch) => {
            if let Some(title) = non_empty(&patch.title) {
                next.title = title.to_string();
            }
            if let Some(summary) = non_empty(&patch.summary) {
                next.summary = summary.to_string();
            }
            if let Some(art_style) = non_empty(&patch.art_style) {
                next.art_style = art_style.to_string();
            }
            if let Some(protagonist) = non_empty(&patch.protagonist) {
                next.protagonist = protagonist.to_string();
            }
        }
        Update::ReplaceScenes(scenes) => {
            next.scenes = scenes;
            next.renumber_scenes();
            reconcile_completion(&mut next);
        }
        Update::Scene { id, patch } => {
            let scene = next
                .scene_mut(&id)
                .ok_or_else(|| WorkflowError::SceneNotFound(id.clone()))?;
            patch_scene(scene, patch)?;
            reconcile_completion(&mut next);
        }
        Update::Workflow(state) => {
            set_state(&mut next, state)?;
        }
    }

    Ok(next)
}

fn patch_scene(scene: &mut Scene, patch: ScenePatch) -> Result<()> {
    let before = scene.clone();

    if let Some(summary) = non_empty(&patch.summary) {
        scene.summary = summary.to_string();
    }
    if let Some(value) = &patch.scene_description {
        scene.scene_description = content(value);
    }
    if let Some(value) = &patch.action_description {
        scene.action_description = content(value);
    }
    if let Some(value) = &patch.shot_prompt {
        scene.shot_prompt = content(value);
    }

    if scene.has_action_description() && !scene.has_scene_description() {
        return Err(WorkflowError::StageGate(format!(
            "Scene {} cannot keep an action description without a scene description",
            scene.id
        )));
    }
    if scene.has_shot_prompt() && !scene.has_action_description() {
        return Err(WorkflowError::StageGate(format!(
            "Scene {} cannot keep a shot prompt without an action description",
            scene.id
        )));
    }

    if let Some(status) = patch.status {
        if status == SceneStatus::Completed && !scene.has_shot_prompt() {
            return Err(WorkflowError::StageGate(format!(
                "Scene {} cannot be completed without a shot prompt",
                scene.id
            )));
        }
        scene.status = status;
        return Ok(());
    }

    let summary_changed = scene.summary != before.summary;
    let description_changed = scene.scene_description != before.scene_description;
    let action_changed = scene.action_description != before.action_description;
    let shot_changed = scene.shot_prompt != before.shot_prompt;

    // Downstream content not rewritten by the same patch is now stale
    let stale_downstream = (summary_changed && scene.has_scene_description() && !description_changed)
        || (description_changed && scene.has_action_description() && !action_changed)
        || (action_changed && scene.has_shot_prompt() && !shot_changed);

    if stale_downstream {
        scene.status = SceneStatus::NeedsUpdate;
    } else if description_changed || action_changed || shot_changed {
        scene.status = scene.confirmed_status();
        scene.error = None;
    }
    Ok(())
}
