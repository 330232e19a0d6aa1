//! Project workflow state machine
//!
//! The canonical state set is [`WorkflowState`] from the checkpoint model.
//! The wizard front-end works with its own, coarser [`WizardState`]; both
//! directions of the mapping are total `From` impls so neither side has to
//! guess.
//!
//! Transitions are plain functions over a mutable [`ProjectCheckpoint`].
//! They never persist anything; callers save the checkpoint afterwards.
//!
//! ```text
//! IDLE -> COLLECTING_BASIC_INFO -> BASIC_INFO_COMPLETE -> GENERATING_SCENES
//!      -> SCENE_LIST_EDITING -> SCENE_LIST_CONFIRMED -> REFINING_SCENES
//!      -> ALL_SCENES_COMPLETE -> EXPORTING -> EXPORTED
//! ```

use crate::error::{Result, WorkflowError};
use serde::{Deserialize, Serialize};
use std::fmt;
use storyboard_checkpoint::{ProjectCheckpoint, Scene, WorkflowState};
use tracing::info;

/// State set used by the wizard front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WizardState {
    Idle,
    DataCollecting,
    DataCollected,
    SceneListGenerating,
    SceneListEditing,
    SceneListConfirmed,
    SceneProcessing,
    AllScenesComplete,
    Exporting,
}

impl WizardState {
    pub const ALL: [WizardState; 9] = [
        WizardState::Idle,
        WizardState::DataCollecting,
        WizardState::DataCollected,
        WizardState::SceneListGenerating,
        WizardState::SceneListEditing,
        WizardState::SceneListConfirmed,
        WizardState::SceneProcessing,
        WizardState::AllScenesComplete,
        WizardState::Exporting,
    ];
}

impl From<WizardState> for WorkflowState {
    fn from(state: WizardState) -> Self {
        match state {
            WizardState::Idle => WorkflowState::Idle,
            WizardState::DataCollecting => WorkflowState::CollectingBasicInfo,
            WizardState::DataCollected => WorkflowState::BasicInfoComplete,
            WizardState::SceneListGenerating => WorkflowState::GeneratingScenes,
            WizardState::SceneListEditing => WorkflowState::SceneListEditing,
            WizardState::SceneListConfirmed => WorkflowState::SceneListConfirmed,
            WizardState::SceneProcessing => WorkflowState::RefiningScenes,
            WizardState::AllScenesComplete => WorkflowState::AllScenesComplete,
            WizardState::Exporting => WorkflowState::Exporting,
        }
    }
}

impl From<WorkflowState> for WizardState {
    fn from(state: WorkflowState) -> Self {
        match state {
            WorkflowState::Idle => WizardState::Idle,
            WorkflowState::CollectingBasicInfo => WizardState::DataCollecting,
            WorkflowState::BasicInfoComplete => WizardState::DataCollected,
            WorkflowState::GeneratingScenes => WizardState::SceneListGenerating,
            WorkflowState::SceneListEditing => WizardState::SceneListEditing,
            WorkflowState::SceneListConfirmed => WizardState::SceneListConfirmed,
            WorkflowState::RefiningScenes => WizardState::SceneProcessing,
            WorkflowState::AllScenesComplete => WizardState::AllScenesComplete,
            // The wizard has no terminal export state
            WorkflowState::Exporting | WorkflowState::Exported => WizardState::Exporting,
        }
    }
}

/// Wizard step derived from the workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStep {
    Settings,
    Scenes,
    Refine,
    Export,
}

impl WorkflowStep {
    /// State adopted when a user navigates to this step
    pub fn entry_state(&self) -> WorkflowState {
        match self {
            WorkflowStep::Settings => WorkflowState::CollectingBasicInfo,
            WorkflowStep::Scenes => WorkflowState::SceneListEditing,
            WorkflowStep::Refine => WorkflowState::RefiningScenes,
            WorkflowStep::Export => WorkflowState::AllScenesComplete,
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStep::Settings => "settings",
            WorkflowStep::Scenes => "scenes",
            WorkflowStep::Refine => "refine",
            WorkflowStep::Export => "export",
        };
        f.write_str(name)
    }
}

/// Current wizard step for a workflow state
pub fn current_step(state: WorkflowState) -> WorkflowStep {
    match state {
        WorkflowState::Idle
        | WorkflowState::CollectingBasicInfo
        | WorkflowState::BasicInfoComplete => WorkflowStep::Settings,
        WorkflowState::GeneratingScenes | WorkflowState::SceneListEditing => WorkflowStep::Scenes,
        WorkflowState::SceneListConfirmed | WorkflowState::RefiningScenes => WorkflowStep::Refine,
        WorkflowState::AllScenesComplete | WorkflowState::Exporting | WorkflowState::Exported => {
            WorkflowStep::Export
        }
    }
}

fn transition(project: &mut ProjectCheckpoint, to: WorkflowState) {
    if project.workflow_state != to {
        info!(
            project_id = %project.project_id,
            from = %project.workflow_state,
            to = %to,
            "Workflow transition"
        );
        project.workflow_state = to;
    }
}

/// Record the basic-info transition after settings changed
///
/// All four settings present moves the project to `BASIC_INFO_COMPLETE`
/// unless it is already there or further along. Partial settings only move
/// an `IDLE` project into `COLLECTING_BASIC_INFO`.
pub fn apply_basic_info(project: &mut ProjectCheckpoint) {
    let state = project.workflow_state;
    if project.has_basic_info() {
        if state.rank() < WorkflowState::BasicInfoComplete.rank() {
            transition(project, WorkflowState::BasicInfoComplete);
        }
    } else if state == WorkflowState::Idle {
        transition(project, WorkflowState::CollectingBasicInfo);
    }
}

/// Title, summary and art style are required before scene generation
pub fn ensure_can_generate_scenes(project: &ProjectCheckpoint) -> Result<()> {
    let missing: Vec<&str> = [
        ("title", &project.title),
        ("summary", &project.summary),
        ("artStyle", &project.art_style),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::Precondition(format!(
            "Missing project info: {}",
            missing.join(", ")
        )))
    }
}

/// Enter `GENERATING_SCENES`, returning the state to restore on failure
pub fn begin_scene_generation(project: &mut ProjectCheckpoint) -> Result<WorkflowState> {
    ensure_can_generate_scenes(project)?;
    let previous = project.workflow_state;
    transition(project, WorkflowState::GeneratingScenes);
    Ok(previous)
}

/// Replace the scene list with fresh pending scenes and enter `SCENE_LIST_EDITING`
pub fn complete_scene_generation(project: &mut ProjectCheckpoint, summaries: Vec<String>) {
    project.scenes = summaries
        .into_iter()
        .enumerate()
        .map(|(index, summary)| Scene::new(index as u32 + 1, summary))
        .collect();
    transition(project, WorkflowState::SceneListEditing);
}

/// Restore the pre-generation state after a failed scene-list generation
pub fn abort_scene_generation(project: &mut ProjectCheckpoint, previous: WorkflowState) {
    transition(project, previous);
}

/// Confirm the scene list so refinement can start
pub fn confirm_scene_list(project: &mut ProjectCheckpoint) -> Result<()> {
    if project.scenes.is_empty() {
        return Err(WorkflowError::Precondition(
            "No scenes to confirm, generate the scene list first".to_string(),
        ));
    }
    if project.workflow_state.rank() < WorkflowState::SceneListEditing.rank() {
        return Err(WorkflowError::Precondition(format!(
            "Cannot confirm scenes from state {}",
            project.workflow_state
        )));
    }
    if project.workflow_state.rank() < WorkflowState::SceneListConfirmed.rank() {
        transition(project, WorkflowState::SceneListConfirmed);
    }
    Ok(())
}

/// Enter `REFINING_SCENES`
///
/// With `force` the state is set unconditionally; otherwise the project only
/// moves forward into refinement.
pub fn begin_refinement(project: &mut ProjectCheckpoint, force: bool) {
    if force || project.workflow_state.rank() < WorkflowState::RefiningScenes.rank() {
        transition(project, WorkflowState::RefiningScenes);
    }
}

/// Derived transition into and out of `ALL_SCENES_COMPLETE`
///
/// Runs after every scene mutation. Export states are left alone.
pub fn reconcile_completion(project: &mut ProjectCheckpoint) {
    match project.workflow_state {
        WorkflowState::Exporting | WorkflowState::Exported => {}
        WorkflowState::AllScenesComplete => {
            if !project.all_scenes_completed() {
                transition(project, WorkflowState::RefiningScenes);
            }
        }
        _ => {
            if project.all_scenes_completed() {
                transition(project, WorkflowState::AllScenesComplete);
            }
        }
    }
}

/// Enter `EXPORTING`; requires at least one completed scene
pub fn begin_export(project: &mut ProjectCheckpoint) -> Result<()> {
    if project.completed_scenes().is_empty() {
        return Err(WorkflowError::Precondition(
            "No completed scenes to export".to_string(),
        ));
    }
    transition(project, WorkflowState::Exporting);
    Ok(())
}

pub fn finish_export(project: &mut ProjectCheckpoint) {
    transition(project, WorkflowState::Exported);
}

/// Set the workflow state directly, subject to the same rules as the
/// operation-driven transitions
///
/// - `GENERATING_SCENES` is only entered by scene generation
/// - `BASIC_INFO_COMPLETE` needs all four settings
/// - the scene-list and refinement states need at least one scene
/// - `ALL_SCENES_COMPLETE` is derived and only accepted when every scene is
///   already completed
/// - `EXPORTING` needs a completed scene; `EXPORTED` is only reached from
///   `EXPORTING`
pub fn set_state(project: &mut ProjectCheckpoint, to: WorkflowState) -> Result<()> {
    let from = project.workflow_state;
    let reject = |reason: &str| {
        Err(WorkflowError::InvalidTransition {
            from,
            to,
            reason: reason.to_string(),
        })
    };

    match to {
        WorkflowState::Idle | WorkflowState::CollectingBasicInfo => {}
        WorkflowState::BasicInfoComplete if !project.has_basic_info() => {
            return reject("title, summary, art style and protagonist are required");
        }
        WorkflowState::BasicInfoComplete => {}
        WorkflowState::GeneratingScenes => {
            return reject("only scene generation enters this state");
        }
        WorkflowState::SceneListEditing
        | WorkflowState::SceneListConfirmed
        | WorkflowState::RefiningScenes
            if project.scenes.is_empty() =>
        {
            return reject("the project has no scenes");
        }
        WorkflowState::SceneListEditing
        | WorkflowState::SceneListConfirmed
        | WorkflowState::RefiningScenes => {}
        WorkflowState::AllScenesComplete if !project.all_scenes_completed() => {
            return reject("derived from scene status, not every scene is completed");
        }
        WorkflowState::AllScenesComplete => {}
        WorkflowState::Exporting | WorkflowState::Exported
            if project.completed_scenes().is_empty() =>
        {
            return reject("no completed scenes to export");
        }
        WorkflowState::Exported if from != WorkflowState::Exporting => {
            return reject("export must start in EXPORTING");
        }
        WorkflowState::Exporting | WorkflowState::Exported => {}
    }

    transition(project, to);
    Ok(())
}

/// Navigate back to an earlier step
///
/// Content is never touched. Navigating forward is refused; forward movement
/// only happens through the operations that produce the content.
pub fn navigate_to(project: &mut ProjectCheckpoint, step: WorkflowStep) -> Result<()> {
    let current = current_step(project.workflow_state);
    if step > current {
        return Err(WorkflowError::Precondition(format!(
            "Cannot skip ahead from {} to {}",
            current, step
        )));
    }
    if step < current {
        let target = match step {
            WorkflowStep::Settings if project.has_basic_info() => WorkflowState::BasicInfoComplete,
            other => other.entry_state(),
        };
        transition(project, target);
    }
    Ok(())
}
