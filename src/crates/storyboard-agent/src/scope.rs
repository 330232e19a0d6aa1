//! Session scope shared by the tools of one conversation

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The `(thread_id, project_id)` pair a conversation is bound to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeState {
    pub thread_id: Option<String>,
    pub project_id: Option<String>,
}

/// Shared, mutable session scope
///
/// Cloning shares the same underlying state. Independent sessions use
/// independent scopes.
#[derive(Debug, Clone, Default)]
pub struct ToolScope {
    inner: Arc<RwLock<ScopeState>>,
}

impl ToolScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope for an existing conversation thread
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self::from_state(ScopeState {
            thread_id: Some(thread_id.into()),
            project_id: None,
        })
    }

    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self::from_state(ScopeState {
            thread_id: None,
            project_id: Some(project_id.into()),
        })
    }

    pub fn from_state(state: ScopeState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ScopeState {
        self.inner.read().clone()
    }

    pub fn thread_id(&self) -> Option<String> {
        self.inner.read().thread_id.clone()
    }

    pub fn project_id(&self) -> Option<String> {
        self.inner.read().project_id.clone()
    }

    /// Bind the scope to a project and its thread
    pub fn bind(&self, project_id: &str, thread_id: &str) {
        let mut state = self.inner.write();
        state.project_id = Some(project_id.to_string());
        state.thread_id = Some(thread_id.to_string());
    }

    pub fn clear(&self) {
        *self.inner.write() = ScopeState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let scope = ToolScope::for_thread("thread-1");
        let other = scope.clone();
        other.bind("project-1", "thread-1");

        assert_eq!(scope.project_id().as_deref(), Some("project-1"));
        assert_eq!(scope.thread_id().as_deref(), Some("thread-1"));
    }

    #[test]
    fn test_independent_scopes() {
        let a = ToolScope::new();
        let b = ToolScope::new();
        a.bind("project-a", "thread-a");

        assert_eq!(b.snapshot(), ScopeState::default());
        a.clear();
        assert!(a.project_id().is_none());
    }
}
