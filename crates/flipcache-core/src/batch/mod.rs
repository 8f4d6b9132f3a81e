//! Debounced coordinator for quick field edits (status, priority).
//!
//! Edits are collected until no new one has arrived for the debounce window
//! (trailing edge), then dispatched together. Within one window, edits to
//! the same `(entity, field)` collapse to the last value. The backend only
//! updates one project per call, so a flush is a set of concurrent calls,
//! not a combined request.
//!
//! ```text
//! Idle --queue--> Collecting --window elapsed--> Flushing --> Idle
//!                   ^    |
//!                   +----+ queue (deadline reset)
//! ```

mod coordinator;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::backend::Backend;
use crate::cache::EntityCache;
use crate::error::SyncError;
use crate::models::{Priority, ProjectStatus};

/// Project fields that can be edited through the batcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum MutationField {
    Status,
    Priority,
}

impl MutationField {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "status" => Some(MutationField::Status),
            "priority" => Some(MutationField::Priority),
            _ => None,
        }
    }

    /// Flag name on `project update`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationField::Status => "status",
            MutationField::Priority => "priority",
        }
    }

    /// Check `value` against the field's enum and return its wire form.
    pub fn normalize(&self, value: &str) -> Result<String, SyncError> {
        let wire = match self {
            MutationField::Status => ProjectStatus::parse(value).map(|s| s.as_str()),
            MutationField::Priority => Priority::parse(value).map(|p| p.as_str()),
        };
        wire.map(str::to_string).ok_or_else(|| SyncError::InvalidValue {
            field: self.as_str(),
            value: value.to_string(),
        })
    }
}

impl fmt::Display for MutationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field edit for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct BatchedMutation {
    pub entity_id: i64,
    pub field: MutationField,
    pub value: String,
}

impl BatchedMutation {
    pub fn new(entity_id: i64, field: MutationField, value: impl Into<String>) -> Self {
        Self {
            entity_id,
            field,
            value: value.into(),
        }
    }

    pub fn status(entity_id: i64, status: ProjectStatus) -> Self {
        Self::new(entity_id, MutationField::Status, status.as_str())
    }

    pub fn priority(entity_id: i64, priority: Priority) -> Self {
        Self::new(entity_id, MutationField::Priority, priority.as_str())
    }
}

type Reply = oneshot::Sender<Result<(), SyncError>>;

struct Request {
    mutation: BatchedMutation,
    reply: Reply,
}

/// Handle to the coordinator task. Clone freely; the task flushes whatever
/// is pending and exits once every handle is dropped.
#[derive(Clone)]
pub struct MutationBatcher {
    tx: mpsc::UnboundedSender<Request>,
    window: Duration,
}

impl MutationBatcher {
    /// Start the coordinator on the current runtime.
    pub fn spawn(backend: Arc<dyn Backend>, cache: EntityCache, window: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(coordinator::Coordinator::new(backend, cache, window).run(rx));
        Self { tx, window }
    }

    /// Queue one edit. Resolves once this edit's own backend call has
    /// completed (or once a later edit to the same field that replaced it
    /// has), and settles exactly once.
    pub async fn queue(&self, mutation: BatchedMutation) -> Result<(), SyncError> {
        let value = mutation.field.normalize(&mutation.value)?;
        let mutation = BatchedMutation { value, ..mutation };

        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request { mutation, reply })
            .map_err(|_| SyncError::CoordinatorClosed)?;
        rx.await.map_err(|_| SyncError::CoordinatorClosed)?
    }
}

impl fmt::Debug for MutationBatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationBatcher")
            .field("window", &self.window)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::cache::categories::{DASHBOARD, PROJECT, PROJECTS};
    use crate::test_support::ScriptedBackend;

    const WINDOW: Duration = Duration::from_millis(500);

    fn setup() -> (Arc<ScriptedBackend>, EntityCache, MutationBatcher) {
        let backend = ScriptedBackend::new();
        let cache = EntityCache::new();
        let batcher = MutationBatcher::spawn(backend.clone(), cache.clone(), WINDOW);
        (backend, cache, batcher)
    }

    #[test]
    fn test_field_normalize() {
        assert_eq!(MutationField::Status.normalize("In Progress").unwrap(), "in_progress");
        assert_eq!(MutationField::Priority.normalize("URGENT").unwrap(), "urgent");
        assert_eq!(
            MutationField::Priority.normalize("someday"),
            Err(SyncError::InvalidValue {
                field: "priority",
                value: "someday".to_string()
            })
        );
        assert_eq!(MutationField::parse(" Status "), Some(MutationField::Status));
        assert_eq!(MutationField::parse("budget"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_field_collapses_to_last_value() {
        let (backend, _cache, batcher) = setup();

        let first = batcher.queue(BatchedMutation::new(5, MutationField::Status, "planning"));
        let second = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            batcher
                .queue(BatchedMutation::new(5, MutationField::Status, "in_progress"))
                .await
        };
        let (a, b) = tokio::join!(first, second);

        assert_eq!(a, Ok(()));
        assert_eq!(b, Ok(()));
        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].argv, vec!["project", "update", "5", "--status", "in_progress"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_fields_and_entities_flush_together() {
        let (backend, _cache, batcher) = setup();

        let (a, b, c) = tokio::join!(
            batcher.queue(BatchedMutation::status(1, ProjectStatus::Completed)),
            batcher.queue(BatchedMutation::priority(1, Priority::High)),
            batcher.queue(BatchedMutation::status(2, ProjectStatus::OnHold)),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(backend.count(&["project", "update"]), 3);
        assert_eq!(backend.count(&["project", "update", "1"]), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_is_trailing_edge() {
        let (backend, _cache, batcher) = setup();

        let first = tokio::spawn({
            let batcher = batcher.clone();
            async move { batcher.queue(BatchedMutation::status(1, ProjectStatus::Completed)).await }
        });
        tokio::time::sleep(Duration::from_millis(400)).await;
        let second = tokio::spawn({
            let batcher = batcher.clone();
            async move { batcher.queue(BatchedMutation::status(2, ProjectStatus::Completed)).await }
        });

        // First deadline (500ms) was pushed back to 900ms by the second edit.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(backend.calls().len(), 0);

        assert_eq!(first.await.unwrap(), Ok(()));
        assert_eq!(second.await.unwrap(), Ok(()));
        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_only_rejects_its_own_mutation() {
        let (backend, cache, batcher) = setup();
        backend.fail(
            &["project", "update", "1"],
            BackendError::CommandFailed("ERROR: Project 1 not found".to_string()),
        );
        cache.set(PROJECTS, 1u8, Duration::from_secs(60));
        cache.set(DASHBOARD, 1u8, Duration::from_secs(60));
        cache.set((PROJECT, 2), 1u8, Duration::from_secs(60));

        let (a, b) = tokio::join!(
            batcher.queue(BatchedMutation::status(1, ProjectStatus::Completed)),
            batcher.queue(BatchedMutation::status(2, ProjectStatus::Completed)),
        );

        assert!(matches!(a, Err(SyncError::Backend(BackendError::CommandFailed(_)))));
        assert_eq!(b, Ok(()));
        // Invalidation covers the whole batch regardless of outcome.
        assert_eq!(cache.get::<u8>(PROJECTS), None);
        assert_eq!(cache.get::<u8>(DASHBOARD), None);
        assert_eq!(cache.get::<u8>((PROJECT, 2)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_value_rejected_without_dispatch() {
        let (backend, _cache, batcher) = setup();
        let result = batcher
            .queue(BatchedMutation::new(3, MutationField::Status, "demolished"))
            .await;
        assert!(matches!(result, Err(SyncError::InvalidValue { field: "status", .. })));
        tokio::time::sleep(WINDOW * 2).await;
        assert!(backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_during_flush_waits_for_next_window() {
        let (backend, _cache, batcher) = setup();
        backend.respond_after(&["project", "update", "1"], "", Duration::from_millis(200));

        let first = tokio::spawn({
            let batcher = batcher.clone();
            async move { batcher.queue(BatchedMutation::status(1, ProjectStatus::Completed)).await }
        });
        // Flush starts at 500ms and its call runs until 700ms.
        tokio::time::sleep(Duration::from_millis(600)).await;
        let second = tokio::spawn({
            let batcher = batcher.clone();
            async move { batcher.queue(BatchedMutation::status(2, ProjectStatus::Completed)).await }
        });

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(backend.count(&["project", "update", "2"]), 0);

        assert_eq!(first.await.unwrap(), Ok(()));
        assert_eq!(second.await.unwrap(), Ok(()));
        assert_eq!(backend.count(&["project", "update", "2"]), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_one_handle_keeps_coordinator_running() {
        let (backend, _cache, batcher) = setup();
        let task = tokio::spawn({
            let batcher = batcher.clone();
            async move { batcher.queue(BatchedMutation::priority(4, Priority::Low)).await }
        });
        drop(batcher);
        assert_eq!(task.await.unwrap(), Ok(()));
        assert_eq!(backend.count(&["project", "update", "4", "--priority", "low"]), 1);
    }
}
