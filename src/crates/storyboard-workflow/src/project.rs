//! Project and scene operations over a checkpoint store
//!
//! [`ProjectService`] is the entry point for the wizard front-end and the
//! building block of the agent tools. Every mutating call reloads the
//! checkpoint, computes the next state with [`apply_update`] or a workflow
//! transition, and saves the whole checkpoint.

use crate::error::{Result, WorkflowError};
use crate::export::{render, ExportDocument, ExportFormat};
use crate::limits::Limits;
use crate::scene::SceneLifecycle;
use crate::update::{apply_update, ProjectPatch, ScenePatch, Update};
use crate::workflow::{self, WorkflowStep};
use std::collections::HashSet;
use std::sync::Arc;
use storyboard_checkpoint::{
    new_project_id, new_thread_id, CheckpointStore, ProjectCheckpoint, Scene, WorkflowState,
};
use tracing::{debug, info};

#[derive(Clone)]
pub struct ProjectService {
    store: Arc<dyn CheckpointStore>,
    limits: Limits,
}

impl ProjectService {
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            store,
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Load a project or fail with `ProjectNotFound`
    pub async fn require(&self, project_id: &str) -> Result<ProjectCheckpoint> {
        self.store
            .load(project_id)
            .await?
            .ok_or_else(|| WorkflowError::ProjectNotFound(project_id.to_string()))
    }

    /// Save the whole checkpoint and return the stored version
    pub async fn commit(&self, checkpoint: &ProjectCheckpoint) -> Result<ProjectCheckpoint> {
        let id = self.store.save(checkpoint).await?;
        self.require(&id).await
    }

    /// Create a project in `COLLECTING_BASIC_INFO`
    ///
    /// A thread id can be supplied to bind the project to an existing session.
    pub async fn create_project(
        &self,
        title: Option<&str>,
        thread_id: Option<&str>,
    ) -> Result<ProjectCheckpoint> {
        self.create_project_with_id(None, title, thread_id).await
    }

    /// Create a project under a caller-chosen id
    ///
    /// Fails when a project with that id already exists. Without an id a
    /// fresh one is generated.
    pub async fn create_project_with_id(
        &self,
        project_id: Option<&str>,
        title: Option<&str>,
        thread_id: Option<&str>,
    ) -> Result<ProjectCheckpoint> {
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            self.limits.validate_title(title)?;
        }
        let project_id = match project_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => {
                if self.store.load(id).await?.is_some() {
                    return Err(WorkflowError::Precondition(format!("Project {} already exists", id)));
                }
                id.to_string()
            }
            None => new_project_id(),
        };
        let existing = self.store.list().await?.len();
        self.limits.validate_project_count(existing)?;

        let mut project = ProjectCheckpoint::empty(
            project_id,
            thread_id.map(str::to_string).unwrap_or_else(new_thread_id),
        );
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            project.title = title.trim().to_string();
        }
        project.workflow_state = WorkflowState::CollectingBasicInfo;

        let project = self.commit(&project).await?;
        info!(project_id = %project.project_id, thread_id = %project.thread_id, "Created project");
        Ok(project)
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Option<ProjectCheckpoint>> {
        Ok(self.store.load(project_id).await?)
    }

    /// All projects, most recently updated first
    pub async fn list_projects(&self) -> Result<Vec<ProjectCheckpoint>> {
        Ok(self.store.list().await?)
    }

    /// Delete a project together with its scenes
    pub async fn delete_project(&self, project_id: &str) -> Result<()> {
        self.require(project_id).await?;
        self.store.delete(project_id).await?;
        info!(project_id = %project_id, "Deleted project");
        Ok(())
    }

    /// Merge settings and record the basic-info transition
    pub async fn update_project(&self, project_id: &str, patch: ProjectPatch) -> Result<ProjectCheckpoint> {
        if let Some(title) = patch.title.as_deref().filter(|t| !t.trim().is_empty()) {
            self.limits.validate_title(title)?;
        }
        if let Some(summary) = patch.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            self.limits.validate_summary(summary)?;
        }

        let current = self.require(project_id).await?;
        let mut next = apply_update(&current, Update::Project(patch))?;
        workflow::apply_basic_info(&mut next);
        self.commit(&next).await
    }

    /// Append a pending scene at the end of the list
    pub async fn add_scene(&self, project_id: &str, summary: &str) -> Result<Scene> {
        if summary.trim().is_empty() {
            return Err(WorkflowError::Validation("Scene summary is required".to_string()));
        }
        let current = self.require(project_id).await?;
        if current.scenes.len() >= self.limits.scene_count_max {
            return Err(WorkflowError::Validation(format!(
                "A project holds at most {} scenes",
                self.limits.scene_count_max
            )));
        }

        let scene = Scene::new(current.scenes.len() as u32 + 1, summary.trim());
        let mut scenes = current.scenes.clone();
        scenes.push(scene.clone());

        let next = apply_update(&current, Update::ReplaceScenes(scenes))?;
        self.commit(&next).await?;
        debug!(project_id = %project_id, scene_id = %scene.id, "Added scene");
        Ok(scene)
    }

    pub async fn update_scene(
        &self,
        project_id: &str,
        scene_id: &str,
        patch: ScenePatch,
    ) -> Result<ProjectCheckpoint> {
        if let Some(description) = patch.scene_description.as_deref() {
            self.limits.validate_scene_description(description)?;
        }
        let current = self.require(project_id).await?;
        let next = apply_update(
            &current,
            Update::Scene {
                id: scene_id.to_string(),
                patch,
            },
        )?;
        self.commit(&next).await
    }

    /// Remove a scene; the remaining scenes are renumbered
    pub async fn delete_scene(&self, project_id: &str, scene_id: &str) -> Result<ProjectCheckpoint> {
        let current = self.require(project_id).await?;
        if current.scene(scene_id).is_none() {
            return Err(WorkflowError::SceneNotFound(scene_id.to_string()));
        }
        let scenes = current.scenes.iter().filter(|s| s.id != scene_id).cloned().collect();
        let next = apply_update(&current, Update::ReplaceScenes(scenes))?;
        self.commit(&next).await
    }

    /// Replace the scene list wholesale (manual editing of the generated list)
    pub async fn replace_scenes(&self, project_id: &str, scenes: Vec<Scene>) -> Result<ProjectCheckpoint> {
        let current = self.require(project_id).await?;
        let next = apply_update(&current, Update::ReplaceScenes(scenes))?;
        self.commit(&next).await
    }

    /// Reassign scene order to follow `ordered_ids`
    pub async fn reorder_scenes(&self, project_id: &str, ordered_ids: &[String]) -> Result<ProjectCheckpoint> {
        let current = self.require(project_id).await?;
        let mut next = current.clone();
        next.scenes = reorder(&current.scenes, ordered_ids);
        self.commit(&next).await
    }

    /// Clear `error` / `needs_update` back to the last confirmed stage
    pub async fn recover_scene(&self, project_id: &str, scene_id: &str) -> Result<ProjectCheckpoint> {
        let mut project = self.require(project_id).await?;
        project
            .scene_mut(scene_id)
            .ok_or_else(|| WorkflowError::SceneNotFound(scene_id.to_string()))?
            .recover();
        workflow::reconcile_completion(&mut project);
        self.commit(&project).await
    }

    /// Set the workflow state directly; illegal targets fail with
    /// `InvalidTransition` and nothing is saved
    pub async fn set_workflow_state(&self, project_id: &str, state: WorkflowState) -> Result<ProjectCheckpoint> {
        let current = self.require(project_id).await?;
        let next = apply_update(&current, Update::Workflow(state))?;
        self.commit(&next).await
    }

    /// Move back to an earlier wizard step without touching content
    pub async fn navigate_to(&self, project_id: &str, step: WorkflowStep) -> Result<ProjectCheckpoint> {
        let mut project = self.require(project_id).await?;
        workflow::navigate_to(&mut project, step)?;
        self.commit(&project).await
    }

    pub async fn confirm_scenes(&self, project_id: &str) -> Result<ProjectCheckpoint> {
        let mut project = self.require(project_id).await?;
        workflow::confirm_scene_list(&mut project)?;
        self.commit(&project).await
    }

    /// Two-phase export: `EXPORTING` is saved before rendering, `EXPORTED` after
    pub async fn export_prompts(
        &self,
        project_id: &str,
        format: ExportFormat,
        include_metadata: bool,
    ) -> Result<ExportDocument> {
        let mut project = self.require(project_id).await?;
        let previous = project.workflow_state;
        workflow::begin_export(&mut project)?;
        let project = self.commit(&project).await?;

        match render(&project, format, include_metadata) {
            Ok(document) => {
                let mut project = project;
                workflow::finish_export(&mut project);
                self.commit(&project).await?;
                info!(project_id = %project_id, format = %format, scenes = document.scenes_count, "Exported project");
                Ok(document)
            }
            Err(e) => {
                let mut project = project;
                project.workflow_state = previous;
                self.commit(&project).await?;
                Err(e)
            }
        }
    }
}

/// Scenes in the order given by `ordered_ids`, numbered 1..N
///
/// Unknown and repeated ids are ignored; scenes not mentioned follow the
/// mentioned ones in their previous relative order.
pub fn reorder(scenes: &[Scene], ordered_ids: &[String]) -> Vec<Scene> {
    let mut current: Vec<&Scene> = scenes.iter().collect();
    current.sort_by_key(|s| s.order);

    let mut seen = HashSet::new();
    let mut result: Vec<Scene> = Vec::with_capacity(scenes.len());

    for id in ordered_ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        if let Some(scene) = current.iter().find(|s| &s.id == id) {
            result.push((*scene).clone());
        }
    }
    for scene in current {
        if !seen.contains(scene.id.as_str()) {
            result.push(scene.clone());
        }
    }

    for (index, scene) in result.iter_mut().enumerate() {
        scene.order = index as u32 + 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use storyboard_checkpoint::InMemoryCheckpointStore;

    fn service() -> ProjectService {
        ProjectService::new(Arc::new(InMemoryCheckpointStore::new()))
    }

    fn scenes(count: u32) -> Vec<Scene> {
        (1..=count).map(|n| Scene::new(n, format!("scene {}", n))).collect()
    }

    #[tokio::test]
    async fn test_create_project() {
        let service = service();
        let project = service.create_project(Some("Harbor"), None).await.unwrap();
        assert_eq!(project.title, "Harbor");
        assert_eq!(project.workflow_state, WorkflowState::CollectingBasicInfo);
        assert!(service.get_project(&project.project_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_project_validates_title() {
        let service = service();
        let long = "x".repeat(51);
        assert!(matches!(
            service.create_project(Some(&long), None).await,
            Err(WorkflowError::Validation(_))
        ));
        assert!(service.list_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_project_completes_basic_info() {
        let service = service();
        let project = service.create_project(Some("T"), Some("thread-x")).await.unwrap();
        assert_eq!(project.thread_id, "thread-x");

        let patch = ProjectPatch {
            summary: Some("A keeper finds a bottle.".to_string()),
            art_style: Some("ink".to_string()),
            protagonist: Some("Mara".to_string()),
            ..Default::default()
        };
        let updated = service.update_project(&project.project_id, patch).await.unwrap();
        assert_eq!(updated.workflow_state, WorkflowState::BasicInfoComplete);
        assert!(updated.updated_at >= project.updated_at);
        assert_eq!(updated.created_at, project.created_at);
    }

    #[tokio::test]
    async fn test_missing_project() {
        let service = service();
        assert!(matches!(
            service.update_project("nope", ProjectPatch::default()).await,
            Err(WorkflowError::ProjectNotFound(_))
        ));
        assert!(service.delete_project("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_scene_crud() {
        let service = service();
        let project = service.create_project(Some("T"), None).await.unwrap();
        let id = project.project_id.clone();

        let first = service.add_scene(&id, "first").await.unwrap();
        let second = service.add_scene(&id, "second").await.unwrap();
        let third = service.add_scene(&id, "third").await.unwrap();
        assert_eq!(third.order, 3);

        let project = service.delete_scene(&id, &second.id).await.unwrap();
        let orders: Vec<(u32, String)> = project.scenes.iter().map(|s| (s.order, s.id.clone())).collect();
        assert_eq!(orders, vec![(1, first.id.clone()), (2, third.id.clone())]);

        assert!(matches!(
            service.delete_scene(&id, &second.id).await,
            Err(WorkflowError::SceneNotFound(_))
        ));

        service.delete_project(&id).await.unwrap();
        assert!(service.get_project(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reorder_persists() {
        let service = service();
        let project = service.create_project(None, None).await.unwrap();
        let project = service
            .replace_scenes(&project.project_id, scenes(3))
            .await
            .unwrap();
        let ids: Vec<String> = project.scenes.iter().rev().map(|s| s.id.clone()).collect();

        let reordered = service.reorder_scenes(&project.project_id, &ids).await.unwrap();
        let mut stored = reordered.scenes.clone();
        stored.sort_by_key(|s| s.order);
        let stored_ids: Vec<String> = stored.into_iter().map(|s| s.id).collect();
        assert_eq!(stored_ids, ids);
    }

    #[test]
    fn test_reorder_ignores_unknown_and_keeps_unmentioned() {
        let scenes = scenes(3);
        let ids = vec![scenes[2].id.clone(), "ghost".to_string(), scenes[2].id.clone()];
        let result = reorder(&scenes, &ids);

        let summaries: Vec<(u32, &str)> = result.iter().map(|s| (s.order, s.summary.as_str())).collect();
        assert_eq!(summaries, vec![(1, "scene 3"), (2, "scene 1"), (3, "scene 2")]);
    }

    #[tokio::test]
    async fn test_export_two_phase() {
        let service = service();
        let project = service.create_project(Some("T"), None).await.unwrap();
        let id = project.project_id.clone();
        service.add_scene(&id, "only").await.unwrap();

        assert!(matches!(
            service.export_prompts(&id, ExportFormat::Json, false).await,
            Err(WorkflowError::Precondition(_))
        ));
        let unchanged = service.require(&id).await.unwrap();
        assert_eq!(unchanged.workflow_state, WorkflowState::CollectingBasicInfo);

        let scene_id = unchanged.scenes[0].id.clone();
        let patch = ScenePatch {
            scene_description: Some("d".to_string()),
            action_description: Some("a".to_string()),
            shot_prompt: Some("p".to_string()),
            ..Default::default()
        };
        let project = service.update_scene(&id, &scene_id, patch).await.unwrap();
        assert_eq!(project.workflow_state, WorkflowState::AllScenesComplete);

        let document = service.export_prompts(&id, ExportFormat::Text, false).await.unwrap();
        assert_eq!(document.scenes_count, 1);
        let exported = service.require(&id).await.unwrap();
        assert_eq!(exported.workflow_state, WorkflowState::Exported);
    }

    #[tokio::test]
    async fn test_create_project_with_requested_id() {
        let service = service();
        let project = service
            .create_project_with_id(Some("project-fixed"), Some("T"), None)
            .await
            .unwrap();
        assert_eq!(project.project_id, "project-fixed");
        assert!(service.get_project("project-fixed").await.unwrap().is_some());

        assert!(matches!(
            service.create_project_with_id(Some("project-fixed"), None, None).await,
            Err(WorkflowError::Precondition(_))
        ));
    }

    #[tokio::test]
    async fn test_create_project_respects_max_projects() {
        let limits = Limits {
            max_projects: 2,
            ..Default::default()
        };
        let service = service().with_limits(limits);
        service.create_project(Some("one"), None).await.unwrap();
        service.create_project(Some("two"), None).await.unwrap();

        assert!(matches!(
            service.create_project(Some("three"), None).await,
            Err(WorkflowError::Validation(_))
        ));
        assert_eq!(service.list_projects().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_scene_rejects_long_description() {
        let service = service();
        let project = service.create_project(None, None).await.unwrap();
        let scene = service.add_scene(&project.project_id, "s").await.unwrap();

        let patch = ScenePatch {
            scene_description: Some("d".repeat(2001)),
            ..Default::default()
        };
        assert!(matches!(
            service.update_scene(&project.project_id, &scene.id, patch).await,
            Err(WorkflowError::Validation(_))
        ));
        let stored = service.require(&project.project_id).await.unwrap();
        assert!(stored.scenes[0].scene_description.is_none());
    }

    #[tokio::test]
    async fn test_set_workflow_state_rejects_illegal_targets() {
        let service = service();
        let project = service.create_project(Some("T"), None).await.unwrap();
        let id = project.project_id.clone();
        service.add_scene(&id, "pending").await.unwrap();

        for target in [WorkflowState::AllScenesComplete, WorkflowState::Exported] {
            assert!(matches!(
                service.set_workflow_state(&id, target).await,
                Err(WorkflowError::InvalidTransition { .. })
            ));
        }
        let stored = service.require(&id).await.unwrap();
        assert_eq!(stored.workflow_state, WorkflowState::CollectingBasicInfo);

        let project = service.set_workflow_state(&id, WorkflowState::SceneListEditing).await.unwrap();
        assert_eq!(project.workflow_state, WorkflowState::SceneListEditing);
    }

    #[tokio::test]
    async fn test_recover_scene() {
        let service = service();
        let project = service.create_project(None, None).await.unwrap();
        let mut failed = Scene::new(1, "s");
        failed.mark_failed("boom");
        let project = service.replace_scenes(&project.project_id, vec![failed]).await.unwrap();

        let scene_id = project.scenes[0].id.clone();
        let project = service.recover_scene(&project.project_id, &scene_id).await.unwrap();
        assert_eq!(project.scenes[0].status, storyboard_checkpoint::SceneStatus::Pending);
    }

    proptest! {
        #[test]
        fn prop_reorder_matches_permutation(
            permutation in (1usize..12).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
        ) {
            let scenes = scenes(permutation.len() as u32);
            let ids: Vec<String> = permutation.iter().map(|&i| scenes[i].id.clone()).collect();
            let result = reorder(&scenes, &ids);

            prop_assert_eq!(result.len(), scenes.len());
            for (index, scene) in result.iter().enumerate() {
                prop_assert_eq!(scene.order as usize, index + 1);
                prop_assert_eq!(&scene.id, &ids[index]);
            }
        }
    }
}
