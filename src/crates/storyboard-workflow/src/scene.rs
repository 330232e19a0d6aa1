//! Scene status sub-machine and stage gating
//!
//! A scene is refined in three stages, each depending on the previous one:
//!
//! ```text
//! pending -> scene_generating -> scene_confirmed
//!         -> action_generating -> action_confirmed
//!         -> prompt_generating -> completed
//! ```
//!
//! Whole-scene refinement (`in_progress`) runs all three at once. Failures
//! either revert to the pre-attempt status with the message recorded
//! ([`SceneLifecycle::fail_stage`]) or park the scene in `error`
//! ([`SceneLifecycle::mark_failed`]); [`SceneLifecycle::recover`] brings an
//! `error` or `needs_update` scene back to its last confirmed stage.

use crate::error::{Result, WorkflowError};
use serde::{Deserialize, Serialize};
use std::fmt;
use storyboard_checkpoint::{Scene, SceneStatus};

/// Refinement stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SceneDescription,
    ActionDescription,
    ShotPrompt,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::SceneDescription, Stage::ActionDescription, Stage::ShotPrompt];

    fn generating_status(&self) -> SceneStatus {
        match self {
            Stage::SceneDescription => SceneStatus::SceneGenerating,
            Stage::ActionDescription => SceneStatus::ActionGenerating,
            Stage::ShotPrompt => SceneStatus::PromptGenerating,
        }
    }

    fn confirmed_status(&self) -> SceneStatus {
        match self {
            Stage::SceneDescription => SceneStatus::SceneConfirmed,
            Stage::ActionDescription => SceneStatus::ActionConfirmed,
            Stage::ShotPrompt => SceneStatus::Completed,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::SceneDescription => "scene description",
            Stage::ActionDescription => "action description",
            Stage::ShotPrompt => "shot prompt",
        };
        f.write_str(name)
    }
}

/// All three stage outputs for one scene
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedScene {
    pub scene_description: String,
    pub action_description: String,
    pub shot_prompt: String,
}

/// Status transitions on a [`Scene`]
pub trait SceneLifecycle {
    /// Check that `stage` may run given the fields already populated
    fn check_gate(&self, stage: Stage) -> Result<()>;

    /// Enter the stage's generating status, returning the status to restore
    fn begin_stage(&mut self, stage: Stage) -> Result<SceneStatus>;

    /// Store generated content and confirm the stage
    ///
    /// Replacing content that later stages were built on leaves the scene
    /// `needs_update` instead.
    fn apply_stage(&mut self, stage: Stage, content: &str) -> Result<()>;

    /// Revert to the pre-attempt status and record the failure
    fn fail_stage(&mut self, previous: SceneStatus, message: impl Into<String>);

    /// Revert to the pre-attempt status without recording anything
    fn cancel_stage(&mut self, previous: SceneStatus);

    /// Enter whole-scene refinement, returning the status to restore
    fn begin_refinement(&mut self) -> Result<SceneStatus>;

    /// Apply all three stage outputs in order
    fn apply_refinement(&mut self, refined: &RefinedScene) -> Result<()>;

    /// Park the scene in `error` with a message
    fn mark_failed(&mut self, message: impl Into<String>);

    /// Last confirmed status implied by the populated fields
    fn confirmed_status(&self) -> SceneStatus;

    /// Leave `error` / `needs_update` for the last confirmed status
    fn recover(&mut self);
}

impl SceneLifecycle for Scene {
    fn check_gate(&self, stage: Stage) -> Result<()> {
        match stage {
            Stage::SceneDescription => Ok(()),
            Stage::ActionDescription if !self.has_scene_description() => Err(WorkflowError::StageGate(
                format!("Scene {} needs a scene description before its action description", self.id),
            )),
            Stage::ShotPrompt if !self.has_scene_description() || !self.has_action_description() => {
                Err(WorkflowError::StageGate(format!(
                    "Scene {} needs scene and action descriptions before its shot prompt",
                    self.id
                )))
            }
            _ => Ok(()),
        }
    }

    fn begin_stage(&mut self, stage: Stage) -> Result<SceneStatus> {
        self.check_gate(stage)?;
        if self.status.is_generating() {
            return Err(WorkflowError::Precondition(format!(
                "Scene {} is already generating ({})",
                self.id, self.status
            )));
        }
        let previous = self.status;
        self.status = stage.generating_status();
        Ok(previous)
    }

    fn apply_stage(&mut self, stage: Stage, content: &str) -> Result<()> {
        self.check_gate(stage)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(WorkflowError::Generation(format!("Empty {} returned", stage)));
        }

        let value = Some(content.to_string());
        let has_downstream = match stage {
            Stage::SceneDescription => self.has_action_description(),
            Stage::ActionDescription => self.has_shot_prompt(),
            Stage::ShotPrompt => false,
        };
        let field = match stage {
            Stage::SceneDescription => &mut self.scene_description,
            Stage::ActionDescription => &mut self.action_description,
            Stage::ShotPrompt => &mut self.shot_prompt,
        };
        let changed = *field != value;
        *field = value;

        self.status = if changed && has_downstream {
            SceneStatus::NeedsUpdate
        } else {
            self.confirmed_status()
        };
        self.error = None;
        Ok(())
    }

    fn fail_stage(&mut self, previous: SceneStatus, message: impl Into<String>) {
        self.status = previous;
        self.error = Some(message.into());
    }

    fn cancel_stage(&mut self, previous: SceneStatus) {
        self.status = previous;
    }

    fn begin_refinement(&mut self) -> Result<SceneStatus> {
        if self.status.is_generating() {
            return Err(WorkflowError::Precondition(format!(
                "Scene {} is already generating ({})",
                self.id, self.status
            )));
        }
        let previous = self.status;
        self.status = SceneStatus::InProgress;
        Ok(previous)
    }

    fn apply_refinement(&mut self, refined: &RefinedScene) -> Result<()> {
        // Validate on a copy so a malformed result leaves no partial fields
        let mut draft = self.clone();
        draft.apply_stage(Stage::SceneDescription, &refined.scene_description)?;
        draft.apply_stage(Stage::ActionDescription, &refined.action_description)?;
        draft.apply_stage(Stage::ShotPrompt, &refined.shot_prompt)?;
        *self = draft;
        Ok(())
    }

    fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = SceneStatus::Error;
        self.error = Some(message.into());
    }

    fn confirmed_status(&self) -> SceneStatus {
        match (
            self.has_scene_description(),
            self.has_action_description(),
            self.has_shot_prompt(),
        ) {
            (true, true, true) => SceneStatus::Completed,
            (true, true, false) => SceneStatus::ActionConfirmed,
            (true, false, _) => SceneStatus::SceneConfirmed,
            (false, _, _) => SceneStatus::Pending,
        }
    }

    fn recover(&mut self) {
        if matches!(self.status, SceneStatus::Error | SceneStatus::NeedsUpdate) || self.status.is_generating() {
            self.status = self.confirmed_status();
        }
    }
}
