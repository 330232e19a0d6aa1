//! Input limits for project settings and scene generation

use crate::error::{Result, WorkflowError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_title_max")]
    pub title_max: usize,
    #[serde(default = "default_summary_min")]
    pub summary_min: usize,
    #[serde(default = "default_summary_max")]
    pub summary_max: usize,
    #[serde(default = "default_scene_count_min")]
    pub scene_count_min: usize,
    #[serde(default = "default_scene_count_max")]
    pub scene_count_max: usize,
    #[serde(default = "default_scene_description_max")]
    pub scene_description_max: usize,
    #[serde(default = "default_max_projects")]
    pub max_projects: usize,
}

fn default_title_max() -> usize {
    50
}

fn default_summary_min() -> usize {
    10
}

fn default_summary_max() -> usize {
    5000
}

fn default_scene_count_min() -> usize {
    1
}

fn default_scene_count_max() -> usize {
    20
}

fn default_scene_description_max() -> usize {
    2000
}

fn default_max_projects() -> usize {
    50
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            title_max: default_title_max(),
            summary_min: default_summary_min(),
            summary_max: default_summary_max(),
            scene_count_min: default_scene_count_min(),
            scene_count_max: default_scene_count_max(),
            scene_description_max: default_scene_description_max(),
            max_projects: default_max_projects(),
        }
    }
}

impl Limits {
    /// Title must be 1..=title_max characters
    pub fn validate_title(&self, title: &str) -> Result<()> {
        let len = title.trim().chars().count();
        if len == 0 || len > self.title_max {
            return Err(WorkflowError::Validation(format!(
                "Title must be 1-{} characters, got {}",
                self.title_max, len
            )));
        }
        Ok(())
    }

    pub fn validate_summary(&self, summary: &str) -> Result<()> {
        let len = summary.trim().chars().count();
        if len < self.summary_min || len > self.summary_max {
            return Err(WorkflowError::Validation(format!(
                "Summary must be {}-{} characters, got {}",
                self.summary_min, self.summary_max, len
            )));
        }
        Ok(())
    }

    pub fn validate_scene_count(&self, count: usize) -> Result<()> {
        if count < self.scene_count_min || count > self.scene_count_max {
            return Err(WorkflowError::Validation(format!(
                "Scene count must be {}-{}, got {}",
                self.scene_count_min, self.scene_count_max, count
            )));
        }
        Ok(())
    }

    pub fn validate_scene_description(&self, description: &str) -> Result<()> {
        let len = description.trim().chars().count();
        if len > self.scene_description_max {
            return Err(WorkflowError::Validation(format!(
                "Scene description must be at most {} characters, got {}",
                self.scene_description_max, len
            )));
        }
        Ok(())
    }

    /// `existing` is the number of stored projects before the new one
    pub fn validate_project_count(&self, existing: usize) -> Result<()> {
        if existing >= self.max_projects {
            return Err(WorkflowError::Validation(format!(
                "At most {} projects can be stored",
                self.max_projects
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_limits_count_characters() {
        let limits = Limits::default();
        assert!(limits.validate_title("").is_err());
        assert!(limits.validate_title(&"月".repeat(50)).is_ok());
        assert!(limits.validate_title(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_summary_limits() {
        let limits = Limits::default();
        assert!(limits.validate_summary("too short").is_err());
        assert!(limits.validate_summary("long enough now").is_ok());
    }

    #[test]
    fn test_scene_count_limits() {
        let limits = Limits::default();
        assert!(limits.validate_scene_count(0).is_err());
        assert!(limits.validate_scene_count(1).is_ok());
        assert!(limits.validate_scene_count(20).is_ok());
        assert!(limits.validate_scene_count(21).is_err());
    }

    #[test]
    fn test_scene_description_and_project_limits() {
        let limits = Limits::default();
        assert!(limits.validate_scene_description(&"d".repeat(2000)).is_ok());
        assert!(limits.validate_scene_description(&"d".repeat(2001)).is_err());

        assert!(limits.validate_project_count(49).is_ok());
        assert!(limits.validate_project_count(50).is_err());
    }

    #[test]
    fn test_partial_limits_fill_defaults() {
        let limits: Limits = serde_json::from_str(r#"{"max_projects": 3}"#).unwrap();
        assert_eq!(limits.max_projects, 3);
        assert_eq!(limits.scene_description_max, 2000);
        assert_eq!(limits.scene_count_max, 20);
    }
}
