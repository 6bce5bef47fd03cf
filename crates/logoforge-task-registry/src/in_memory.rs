//! In-memory Task Registry backend. Suitable for development, tests, and
//! single-instance deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logoforge_domain::{Task, TaskMetadata, TaskStatus, TaskType};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::TaskRegistryError;
use crate::state_machine;
use crate::traits::{TaskRegistry, TransitionPatch};

#[derive(Clone, Default)]
pub struct InMemoryTaskRegistry {
    tasks: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl InMemoryTaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRegistry for InMemoryTaskRegistry {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }

    async fn create(&self, user_id: Uuid, metadata: TaskMetadata) -> Result<Task, TaskRegistryError> {
        let task = Task::new(user_id, metadata);

        // Check-and-insert under one write-lock acquisition: no other
        // caller can observe an empty active set and also insert between
        // our check and our insert, which is what makes this atomic rather
        // than a separate `list_active` round trip (spec.md S3).
        let mut tasks = self.tasks.write().await;
        let already_active = tasks
            .values()
            .any(|t| t.user_id == user_id && t.task_type == task.task_type && !t.status.is_terminal());
        if already_active {
            return Err(TaskRegistryError::ActiveTaskExists);
        }
        tasks.insert(task.task_id, task.clone());
        Ok(task)
    }

    async fn get(&self, task_id: Uuid) -> Result<Option<Task>, TaskRegistryError> {
        Ok(self.tasks.read().await.get(&task_id).cloned())
    }

    async fn transition(
        &self,
        task_id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
        patch: TransitionPatch,
    ) -> Result<Task, TaskRegistryError> {
        state_machine::validate_transition(from, to)?;

        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&task_id).ok_or(TaskRegistryError::NotFound(task_id))?;

        if task.status != from {
            return Err(TaskRegistryError::TransitionConflict {
                task_id,
                expected: from,
                actual: task.status,
            });
        }

        task.status = to;
        if let Some(result_id) = patch.result_id {
            task.result_id = Some(result_id);
        }
        if let Some(error_message) = patch.error_message {
            task.error_message = Some(error_message);
        }
        if let Some(metadata) = patch.metadata {
            task.metadata = metadata;
        }
        task.updated_at = Utc::now().max(task.updated_at);
        Ok(task.clone())
    }

    async fn list_active(&self, user_id: Uuid, task_type: TaskType) -> Result<Vec<Task>, TaskRegistryError> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .values()
            .filter(|t| t.user_id == user_id && t.task_type == task_type && !t.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<TaskStatus>,
        task_type: Option<TaskType>,
        limit: u32,
    ) -> Result<Vec<Task>, TaskRegistryError> {
        let tasks = self.tasks.read().await;
        let mut matching: Vec<Task> = tasks
            .values()
            .filter(|t| t.user_id == user_id)
            .filter(|t| status.is_none_or(|s| t.status == s))
            .filter(|t| task_type.is_none_or(|ty| t.task_type == ty))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn set_cancelled(&self, task_id: Uuid) -> Result<Task, TaskRegistryError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&task_id).ok_or(TaskRegistryError::NotFound(task_id))?;
        if !task.is_cancelled {
            task.is_cancelled = true;
            task.updated_at = Utc::now().max(task.updated_at);
        }
        Ok(task.clone())
    }

    async fn mark_failed_if_stale(
        &self,
        status: TaskStatus,
        older_than: DateTime<Utc>,
        error_message: &str,
    ) -> Result<Vec<Uuid>, TaskRegistryError> {
        let mut tasks = self.tasks.write().await;
        let mut reaped = Vec::new();
        for task in tasks.values_mut() {
            let watched_timestamp = match status {
                TaskStatus::Processing => task.updated_at,
                TaskStatus::Pending => task.created_at,
                _ => continue,
            };
            if task.status == status && watched_timestamp < older_than {
                task.status = TaskStatus::Failed;
                task.error_message = Some(logoforge_domain::clamp_error_message(error_message));
                task.updated_at = Utc::now();
                reaped.push(task.task_id);
            }
        }
        Ok(reaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logoforge_domain::TaskMetadata;

    fn generate_metadata() -> TaskMetadata {
        TaskMetadata::Generate {
            logo_description: "A minimalist fox".into(),
            theme_description: "forest green and cream".into(),
            num_palettes: 3,
            partial_failures: vec![],
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let registry = InMemoryTaskRegistry::new();
        let user_id = Uuid::new_v4();
        let task = registry.create(user_id, generate_metadata()).await.unwrap();
        let fetched = registry.get(task.task_id).await.unwrap().unwrap();
        assert_eq!(fetched.task_id, task.task_id);
        assert_eq!(fetched.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn transition_fails_on_status_mismatch() {
        let registry = InMemoryTaskRegistry::new();
        let user_id = Uuid::new_v4();
        let task = registry.create(user_id, generate_metadata()).await.unwrap();

        let result = registry
            .transition(task.task_id, TaskStatus::Processing, TaskStatus::Completed, TransitionPatch::default())
            .await;
        assert!(matches!(result, Err(TaskRegistryError::TransitionConflict { .. })));
    }

    #[tokio::test]
    async fn concurrent_claims_exactly_one_wins() {
        let registry = Arc::new(InMemoryTaskRegistry::new());
        let user_id = Uuid::new_v4();
        let task = registry.create(user_id, generate_metadata()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let task_id = task.task_id;
            handles.push(tokio::spawn(async move {
                registry
                    .transition(task_id, TaskStatus::Pending, TaskStatus::Processing, TransitionPatch::default())
                    .await
            }));
        }
        let results = futures::future::join_all(handles).await;
        let successes = results.into_iter().filter(|r| r.as_ref().unwrap().is_ok()).count();
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn list_active_excludes_terminal_tasks() {
        let registry = InMemoryTaskRegistry::new();
        let user_id = Uuid::new_v4();
        let task = registry.create(user_id, generate_metadata()).await.unwrap();
        assert_eq!(registry.list_active(user_id, TaskType::Generate).await.unwrap().len(), 1);

        registry
            .transition(task.task_id, TaskStatus::Pending, TaskStatus::Processing, TransitionPatch::default())
            .await
            .unwrap();
        registry
            .transition(
                task.task_id,
                TaskStatus::Processing,
                TaskStatus::Completed,
                TransitionPatch::completed(Uuid::new_v4()),
            )
            .await
            .unwrap();
        assert_eq!(registry.list_active(user_id, TaskType::Generate).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn terminal_task_is_immutable() {
        let registry = InMemoryTaskRegistry::new();
        let user_id = Uuid::new_v4();
        let task = registry.create(user_id, generate_metadata()).await.unwrap();
        registry
            .transition(task.task_id, TaskStatus::Pending, TaskStatus::Failed, TransitionPatch::failed("nope"))
            .await
            .unwrap();

        let result = registry
            .transition(task.task_id, TaskStatus::Failed, TaskStatus::Processing, TransitionPatch::default())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn set_cancelled_is_idempotent() {
        let registry = InMemoryTaskRegistry::new();
        let user_id = Uuid::new_v4();
        let task = registry.create(user_id, generate_metadata()).await.unwrap();
        let first = registry.set_cancelled(task.task_id).await.unwrap();
        let second = registry.set_cancelled(task.task_id).await.unwrap();
        assert!(first.is_cancelled);
        assert!(second.is_cancelled);
        assert_eq!(first.updated_at, second.updated_at);
    }

    #[tokio::test]
    async fn mark_failed_if_stale_reaps_only_old_processing_tasks() {
        let registry = InMemoryTaskRegistry::new();
        // Distinct users: the at-most-one-active rule forbids two
        // concurrently non-terminal tasks for the same (user, type).
        let stale = registry.create(Uuid::new_v4(), generate_metadata()).await.unwrap();
        let fresh = registry.create(Uuid::new_v4(), generate_metadata()).await.unwrap();
        registry
            .transition(stale.task_id, TaskStatus::Pending, TaskStatus::Processing, TransitionPatch::default())
            .await
            .unwrap();
        registry
            .transition(fresh.task_id, TaskStatus::Pending, TaskStatus::Processing, TransitionPatch::default())
            .await
            .unwrap();

        let cutoff = Utc::now() + chrono::Duration::seconds(1);
        let reaped = registry
            .mark_failed_if_stale(TaskStatus::Processing, cutoff, "timed out in processing")
            .await
            .unwrap();
        assert_eq!(reaped.len(), 2);
        for task_id in [stale.task_id, fresh.task_id] {
            let task = registry.get(task_id).await.unwrap().unwrap();
            assert_eq!(task.status, TaskStatus::Failed);
            assert_eq!(task.error_message.as_deref(), Some("timed out in processing"));
        }
    }
}
