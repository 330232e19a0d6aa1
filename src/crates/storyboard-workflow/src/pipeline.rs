//! Scene refinement pipeline
//!
//! Drives generation calls against a [`GenerationService`] and writes the
//! results back through the checkpoint store:
//!
//! - scene-list generation (`GENERATING_SCENES` -> `SCENE_LIST_EDITING`)
//! - whole-scene refinement, single and batched
//! - per-stage refinement, blocking or streamed with cancellation
//!
//! Every generation call is bounded by the configured timeout. A failure
//! never leaves the project in `GENERATING_SCENES` or a scene in a
//! generating status; the last known-good state is restored and saved.

use crate::error::{Result, WorkflowError};
use crate::generation::{
    with_timeout, GenerationService, SceneListContext, StageContext, ProjectContext,
    DEFAULT_GENERATION_TIMEOUT,
};
use crate::project::ProjectService;
use crate::scene::{SceneLifecycle, Stage};
use crate::stream::{StreamConsumer, StreamOutcome};
use crate::workflow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use storyboard_checkpoint::{ProjectCheckpoint, Scene, SceneStatus};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Outcome of a batch refinement
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub project: ProjectCheckpoint,
    pub refined: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Requested ids that do not exist in the project
    pub missing: Vec<String>,
}

#[derive(Clone)]
pub struct RefinementPipeline {
    projects: ProjectService,
    generator: Arc<dyn GenerationService>,
    timeout: Duration,
}

impl RefinementPipeline {
    pub fn new(projects: ProjectService, generator: Arc<dyn GenerationService>) -> Self {
        Self {
            projects,
            generator,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn projects(&self) -> &ProjectService {
        &self.projects
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Generate a fresh scene list of `count` pending scenes
    ///
    /// Extra summaries beyond `count` (or the configured maximum) are dropped.
    pub async fn generate_scenes(&self, project_id: &str, count: usize) -> Result<ProjectCheckpoint> {
        self.projects.limits().validate_scene_count(count)?;

        let mut project = self.projects.require(project_id).await?;
        let previous = workflow::begin_scene_generation(&mut project)?;
        let project = self.projects.commit(&project).await?;

        let context = SceneListContext {
            project: ProjectContext::from(&project),
            count,
        };
        let result = with_timeout(self.timeout, self.generator.generate_scene_list(&context)).await;

        let mut project = self.projects.require(project_id).await?;
        let mut summaries = match result {
            Ok(summaries) => summaries
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>(),
            Err(e) => {
                workflow::abort_scene_generation(&mut project, previous);
                self.projects.commit(&project).await?;
                warn!(project_id = %project_id, error = %e, "Scene list generation failed");
                return Err(WorkflowError::Generation(e.to_string()));
            }
        };

        summaries.truncate(count.min(self.projects.limits().scene_count_max));
        if summaries.is_empty() {
            workflow::abort_scene_generation(&mut project, previous);
            self.projects.commit(&project).await?;
            return Err(WorkflowError::Generation("Generator returned no scenes".to_string()));
        }

        workflow::complete_scene_generation(&mut project, summaries);
        let project = self.projects.commit(&project).await?;
        info!(project_id = %project_id, scenes = project.scenes.len(), "Generated scene list");
        Ok(project)
    }

    /// Refine all three stages of one scene
    ///
    /// On failure the scene is saved in `error` with the message and the
    /// project keeps `REFINING_SCENES`.
    pub async fn refine_scene(&self, project_id: &str, scene_id: &str) -> Result<ProjectCheckpoint> {
        let mut project = self.projects.require(project_id).await?;
        project
            .scene_mut(scene_id)
            .ok_or_else(|| WorkflowError::SceneNotFound(scene_id.to_string()))?
            .begin_refinement()?;
        workflow::begin_refinement(&mut project, true);
        let project = self.projects.commit(&project).await?;

        let context = match project.scene(scene_id) {
            Some(scene) => StageContext::for_scene(&project, scene),
            None => return Err(WorkflowError::SceneNotFound(scene_id.to_string())),
        };
        let result = with_timeout(self.timeout, self.generator.refine_scene(&context)).await;

        let mut project = self.projects.require(project_id).await?;
        let scene = project
            .scene_mut(scene_id)
            .ok_or_else(|| WorkflowError::SceneNotFound(scene_id.to_string()))?;

        let failure = match result {
            Ok(refined) => scene.apply_refinement(&refined).err().map(|e| e.to_string()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(message) = &failure {
            scene.mark_failed(message.clone());
        }
        workflow::reconcile_completion(&mut project);
        let project = self.projects.commit(&project).await?;

        match failure {
            None => {
                info!(project_id = %project_id, scene_id = %scene_id, "Refined scene");
                Ok(project)
            }
            Some(message) => {
                warn!(project_id = %project_id, scene_id = %scene_id, error = %message, "Scene refinement failed");
                Err(WorkflowError::Generation(message))
            }
        }
    }

    /// Refine several scenes with one concurrent batch call
    ///
    /// The project is saved twice: once with the scenes in progress and once
    /// with every result applied.
    pub async fn batch_refine(&self, project_id: &str, scene_ids: &[String]) -> Result<BatchReport> {
        let mut project = self.projects.require(project_id).await?;

        let (existing, missing): (Vec<String>, Vec<String>) = scene_ids
            .iter()
            .cloned()
            .partition(|id| project.scene(id).is_some());
        let mut requested: Vec<String> = Vec::new();
        for id in existing {
            if !requested.contains(&id) {
                requested.push(id);
            }
        }
        if requested.is_empty() {
            return Err(WorkflowError::SceneNotFound(format!(
                "None of the requested scenes exist: {}",
                scene_ids.join(", ")
            )));
        }

        // Scenes already mid-generation are reported, not restarted
        let mut failed = Vec::new();
        requested.retain(|id| match project.scene_mut(id).map(|scene| scene.begin_refinement()) {
            Some(Ok(_)) => true,
            Some(Err(e)) => {
                failed.push((id.clone(), e.to_string()));
                false
            }
            None => false,
        });
        if requested.is_empty() {
            return Err(WorkflowError::Precondition(format!(
                "Every requested scene is already generating: {}",
                scene_ids.join(", ")
            )));
        }
        workflow::begin_refinement(&mut project, true);
        let project = self.projects.commit(&project).await?;

        let contexts: Vec<StageContext> = requested
            .iter()
            .filter_map(|id| project.scene(id).map(|scene| StageContext::for_scene(&project, scene)))
            .collect();

        let results: HashMap<String, std::result::Result<_, String>> =
            match with_timeout(self.timeout, async { Ok(self.generator.batch_refine(contexts).await) }).await {
                Ok(results) => results
                    .into_iter()
                    .map(|(id, result)| (id, result.map_err(|e| e.to_string())))
                    .collect(),
                Err(e) => requested.iter().map(|id| (id.clone(), Err(e.to_string()))).collect(),
            };

        let mut project = self.projects.require(project_id).await?;
        let mut refined = Vec::new();

        for id in &requested {
            let Some(scene) = project.scene_mut(id) else {
                continue;
            };
            let outcome = match results.get(id) {
                Some(Ok(result)) => scene.apply_refinement(result).map_err(|e| e.to_string()),
                Some(Err(message)) => Err(message.clone()),
                None => Err("No result returned for scene".to_string()),
            };
            match outcome {
                Ok(()) => refined.push(id.clone()),
                Err(message) => {
                    scene.mark_failed(message.clone());
                    failed.push((id.clone(), message));
                }
            }
        }

        workflow::reconcile_completion(&mut project);
        let project = self.projects.commit(&project).await?;
        info!(
            project_id = %project_id,
            refined = refined.len(),
            failed = failed.len(),
            "Batch refinement finished"
        );

        Ok(BatchReport {
            project,
            refined,
            failed,
            missing,
        })
    }

    /// Mark the scene as generating `stage` and save, returning the context
    /// and the status to restore
    async fn begin_stage(
        &self,
        project_id: &str,
        scene_id: &str,
        stage: Stage,
    ) -> Result<(StageContext, SceneStatus)> {
        let mut project = self.projects.require(project_id).await?;
        let scene = project
            .scene_mut(scene_id)
            .ok_or_else(|| WorkflowError::SceneNotFound(scene_id.to_string()))?;
        let previous = scene.begin_stage(stage)?;
        workflow::begin_refinement(&mut project, false);
        let project = self.projects.commit(&project).await?;

        let scene = project
            .scene(scene_id)
            .ok_or_else(|| WorkflowError::SceneNotFound(scene_id.to_string()))?;
        Ok((StageContext::for_scene(&project, scene), previous))
    }

    /// Reload, apply `finish` to the scene, reconcile and save
    async fn finish_stage<F>(&self, project_id: &str, scene_id: &str, finish: F) -> Result<Scene>
    where
        F: FnOnce(&mut Scene) -> Result<()>,
    {
        let mut project = self.projects.require(project_id).await?;
        let scene = project
            .scene_mut(scene_id)
            .ok_or_else(|| WorkflowError::SceneNotFound(scene_id.to_string()))?;
        let outcome = finish(scene);
        let scene = scene.clone();
        workflow::reconcile_completion(&mut project);
        self.projects.commit(&project).await?;
        outcome.map(|_| scene)
    }

    /// Generate one stage of one scene
    pub async fn run_stage(&self, project_id: &str, scene_id: &str, stage: Stage) -> Result<Scene> {
        let (context, previous) = self.begin_stage(project_id, scene_id, stage).await?;
        let result = with_timeout(self.timeout, self.generator.generate_stage(stage, &context)).await;

        self.finish_stage(project_id, scene_id, |scene| match result {
            Ok(content) => scene.apply_stage(stage, &content).map_err(|e| {
                scene.fail_stage(previous, e.to_string());
                e
            }),
            Err(e) => {
                scene.fail_stage(previous, e.to_string());
                Err(WorkflowError::Generation(e.to_string()))
            }
        })
        .await
    }

    /// Stream one stage of one scene
    ///
    /// `on_progress` receives the accumulated text as it grows. Cancelling
    /// `cancel` restores the scene's pre-call status and discards partial
    /// content.
    pub async fn stream_stage<F>(
        &self,
        project_id: &str,
        scene_id: &str,
        stage: Stage,
        cancel: CancellationToken,
        on_progress: F,
    ) -> Result<StreamOutcome>
    where
        F: FnMut(&str) + Send + 'static,
    {
        let (context, previous) = self.begin_stage(project_id, scene_id, stage).await?;

        let consume = async {
            let stream = tokio::select! {
                biased;
                _ = cancel.cancelled() => return StreamOutcome::Cancelled,
                opened = self.generator.stream_stage(stage, &context) => opened,
            };
            match stream {
                Ok(stream) => {
                    StreamConsumer::new(cancel.clone())
                        .on_progress(on_progress)
                        .consume(stream)
                        .await
                }
                Err(e) => StreamOutcome::Error(e.to_string()),
            }
        };
        let outcome = match tokio::time::timeout(self.timeout, consume).await {
            Ok(outcome) => outcome,
            Err(_) => StreamOutcome::Error(format!("Generation timed out after {:?}", self.timeout)),
        };

        let applied = self
            .finish_stage(project_id, scene_id, |scene| match &outcome {
                StreamOutcome::Complete(content) => scene.apply_stage(stage, content).map_err(|e| {
                    scene.fail_stage(previous, e.to_string());
                    e
                }),
                StreamOutcome::Error(reason) => {
                    scene.fail_stage(previous, reason.clone());
                    Ok(())
                }
                StreamOutcome::Cancelled => {
                    scene.cancel_stage(previous);
                    Ok(())
                }
            })
            .await;

        match applied {
            Ok(_) => Ok(outcome),
            Err(e) if e.is_recoverable() => Ok(StreamOutcome::Error(e.to_string())),
            Err(e) => Err(e),
        }
    }
}
