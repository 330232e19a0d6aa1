//! Checkpoint store trait
//!
//! Every backend implements [`CheckpointStore`] with identical semantics:
//!
//! - **`save()`** - Upsert keyed by `project_id`. The first save fixes
//!   `created_at`; later saves keep the stored value and refresh `updated_at`,
//!   which never moves backwards.
//! - **`load()`** - Fetch one checkpoint, `None` if absent
//! - **`list()`** - All checkpoints, most recently updated first
//! - **`delete()`** - Remove one checkpoint; deleting a missing id is a no-op
//!
//! Concurrent saves to the same project are last-writer-wins. There is no
//! version check.

use crate::checkpoint::ProjectCheckpoint;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Save a checkpoint, returning its project id
    async fn save(&self, checkpoint: &ProjectCheckpoint) -> Result<String>;

    /// Load a checkpoint by project id
    async fn load(&self, project_id: &str) -> Result<Option<ProjectCheckpoint>>;

    /// List checkpoints ordered by `updated_at` descending
    async fn list(&self) -> Result<Vec<ProjectCheckpoint>>;

    /// Delete a checkpoint by project id
    async fn delete(&self, project_id: &str) -> Result<()>;

    /// Find the checkpoint bound to a thread id
    ///
    /// The default implementation scans [`list()`](Self::list); backends with
    /// an index should override it.
    async fn find_by_thread_id(&self, thread_id: &str) -> Result<Option<ProjectCheckpoint>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|checkpoint| checkpoint.thread_id == thread_id))
    }
}

/// Timestamps to persist for a save, given the previously stored pair
pub(crate) fn save_timestamps(
    checkpoint: &ProjectCheckpoint,
    existing: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let now = Utc::now();
    match existing {
        Some((created_at, previous_update)) => (created_at, now.max(previous_update)),
        None => (checkpoint.created_at, now.max(checkpoint.created_at)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_first_save_keeps_checkpoint_created_at() {
        let checkpoint = ProjectCheckpoint::new();
        let (created, updated) = save_timestamps(&checkpoint, None);
        assert_eq!(created, checkpoint.created_at);
        assert!(updated >= created);
    }

    #[test]
    fn test_update_never_moves_backwards() {
        let checkpoint = ProjectCheckpoint::new();
        let created = Utc::now() - Duration::days(1);
        let future = Utc::now() + Duration::hours(1);

        let (kept, updated) = save_timestamps(&checkpoint, Some((created, future)));
        assert_eq!(kept, created);
        assert_eq!(updated, future);
    }

    proptest::proptest! {
        #[test]
        fn prop_updated_at_is_monotonic(offset_secs in -86_400i64..86_400) {
            let checkpoint = ProjectCheckpoint::new();
            let created = Utc::now() - Duration::days(2);
            let previous = Utc::now() + Duration::seconds(offset_secs);

            let (kept, updated) = save_timestamps(&checkpoint, Some((created, previous)));
            proptest::prop_assert_eq!(kept, created);
            proptest::prop_assert!(updated >= previous);
        }
    }
}
