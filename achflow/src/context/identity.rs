//! Run identity for tracking pipeline executions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use uuid::Uuid;

tokio::task_local! {
    static CURRENT_RUN: RunIdentity;
}

/// Identifies a pipeline run.
///
/// Nested runs (such as a curation pipeline started by a tool) carry the
/// identifier of the run that spawned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this pipeline run.
    pub run_id: Uuid,
    /// The spawning run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<Uuid>,
}

impl RunIdentity {
    /// Creates a new run identity with a generated run ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            parent_run_id: None,
        }
    }

    /// Creates a child identity of this run.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            parent_run_id: Some(self.run_id),
        }
    }

    /// Sets the parent run ID.
    #[must_use]
    pub fn with_parent(mut self, parent: Uuid) -> Self {
        self.parent_run_id = Some(parent);
        self
    }

    /// Returns the run whose stage is executing on this task, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        CURRENT_RUN.try_with(|run| *run).ok()
    }

    /// Returns a child of the current run, or a root identity when no run
    /// is executing on this task.
    #[must_use]
    pub fn nested() -> Self {
        Self::current().map_or_else(Self::new, |parent| parent.child())
    }

    /// Drives `future` with this identity as the current run.
    pub async fn scope<F: Future>(self, future: F) -> F::Output {
        CURRENT_RUN.scope(self, future).await
    }
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identities_differ() {
        assert_ne!(RunIdentity::new().run_id, RunIdentity::new().run_id);
    }

    #[test]
    fn test_child_links_parent() {
        let parent = RunIdentity::new();
        let child = parent.child();
        assert_eq!(child.parent_run_id, Some(parent.run_id));
        assert_ne!(child.run_id, parent.run_id);
    }

    #[tokio::test]
    async fn test_nested_links_to_scoped_run() {
        assert!(RunIdentity::current().is_none());
        assert!(RunIdentity::nested().parent_run_id.is_none());

        let parent = RunIdentity::new();
        let nested = parent.scope(async { RunIdentity::nested() }).await;

        assert_eq!(nested.parent_run_id, Some(parent.run_id));
        assert!(RunIdentity::current().is_none());
    }

    #[test]
    fn test_serialization_skips_missing_parent() {
        let json = serde_json::to_value(RunIdentity::new()).unwrap();
        assert!(json.get("parent_run_id").is_none());
    }
}
