// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task persistence seam (§4.12). `mark_static_completed` /
//! `mark_dynamic_completed` are atomic column-level updates: the lock is
//! held only long enough to flip the bool and return the post-update
//! snapshot, so the orchestrator's completion barrier never performs a
//! separate read after the write.

use af_core::{FailureKind, Task, TaskId, TaskStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskStoreError {
    #[error("task {0} not found")]
    NotFound(TaskId),
}

#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    async fn insert(&self, task: Task) -> Result<(), TaskStoreError>;
    async fn get(&self, task_id: TaskId) -> Result<Task, TaskStoreError>;
    async fn list(&self) -> Vec<Task>;
    async fn update_status(&self, task_id: TaskId, status: TaskStatus, progress_percent: u8) -> Result<(), TaskStoreError>;
    async fn update_current_step(&self, task_id: TaskId, step: String) -> Result<(), TaskStoreError>;
    async fn set_package_name(&self, task_id: TaskId, package_name: String) -> Result<(), TaskStoreError>;
    async fn mark_should_stop(&self, task_id: TaskId) -> Result<(), TaskStoreError>;
    async fn set_started_at(&self, task_id: TaskId, started_at_ms: u64) -> Result<(), TaskStoreError>;
    async fn set_completed_at(&self, task_id: TaskId, completed_at_ms: u64) -> Result<(), TaskStoreError>;

    /// Terminal failure: status → FAILED, `failure_type`/`error_message`
    /// persisted (§7 "fatal" propagation policy).
    async fn mark_failed(&self, task_id: TaskId, kind: FailureKind, message: String) -> Result<(), TaskStoreError>;
    /// Retryable failure: increments `retry_count`, resets status to
    /// QUEUED, and records the classified kind/message for visibility;
    /// returns the post-increment retry count (§7 "recoverable with retry").
    async fn mark_retryable(&self, task_id: TaskId, kind: FailureKind, message: String) -> Result<u32, TaskStoreError>;

    /// Atomic column update: flip `static_analysis_completed` and return
    /// the post-update task so the caller can check both flags without a
    /// second read (§4.10, §4.12).
    async fn mark_static_completed(&self, task_id: TaskId) -> Result<Task, TaskStoreError>;
    /// Atomic column update: flip `dynamic_analysis_completed`.
    async fn mark_dynamic_completed(&self, task_id: TaskId) -> Result<Task, TaskStoreError>;
}

#[derive(Default)]
pub struct InProcessTaskStore {
    tasks: parking_lot::Mutex<HashMap<TaskId, Task>>,
}

impl InProcessTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_task<R>(&self, task_id: TaskId, f: impl FnOnce(&mut Task) -> R) -> Result<R, TaskStoreError> {
        let mut tasks = self.tasks.lock();
        let task = tasks.get_mut(&task_id).ok_or(TaskStoreError::NotFound(task_id))?;
        Ok(f(task))
    }
}

#[async_trait]
impl TaskStore for InProcessTaskStore {
    async fn insert(&self, task: Task) -> Result<(), TaskStoreError> {
        self.tasks.lock().insert(task.task_id, task);
        Ok(())
    }

    async fn get(&self, task_id: TaskId) -> Result<Task, TaskStoreError> {
        self.tasks.lock().get(&task_id).cloned().ok_or(TaskStoreError::NotFound(task_id))
    }

    async fn list(&self) -> Vec<Task> {
        self.tasks.lock().values().cloned().collect()
    }

    async fn update_status(&self, task_id: TaskId, status: TaskStatus, progress_percent: u8) -> Result<(), TaskStoreError> {
        self.with_task(task_id, |task| {
            task.status = status;
            task.progress_percent = progress_percent;
        })
    }

    async fn update_current_step(&self, task_id: TaskId, step: String) -> Result<(), TaskStoreError> {
        self.with_task(task_id, |task| task.current_step = step)
    }

    async fn set_package_name(&self, task_id: TaskId, package_name: String) -> Result<(), TaskStoreError> {
        self.with_task(task_id, |task| task.package_name = Some(package_name))
    }

    async fn mark_should_stop(&self, task_id: TaskId) -> Result<(), TaskStoreError> {
        self.with_task(task_id, |task| task.should_stop = true)
    }

    async fn set_started_at(&self, task_id: TaskId, started_at_ms: u64) -> Result<(), TaskStoreError> {
        self.with_task(task_id, |task| task.started_at_ms = Some(started_at_ms))
    }

    async fn set_completed_at(&self, task_id: TaskId, completed_at_ms: u64) -> Result<(), TaskStoreError> {
        self.with_task(task_id, |task| task.completed_at_ms = Some(completed_at_ms))
    }

    async fn mark_failed(&self, task_id: TaskId, kind: FailureKind, message: String) -> Result<(), TaskStoreError> {
        self.with_task(task_id, |task| {
            task.status = TaskStatus::Failed;
            task.failure_type = Some(kind);
            task.error_message = Some(message);
        })
    }

    async fn mark_retryable(&self, task_id: TaskId, kind: FailureKind, message: String) -> Result<u32, TaskStoreError> {
        self.with_task(task_id, |task| {
            task.retry_count += 1;
            task.status = TaskStatus::Queued;
            task.failure_type = Some(kind);
            task.error_message = Some(message);
            task.retry_count
        })
    }

    async fn mark_static_completed(&self, task_id: TaskId) -> Result<Task, TaskStoreError> {
        self.with_task(task_id, |task| {
            task.static_analysis_completed = true;
            task.clone()
        })
    }

    async fn mark_dynamic_completed(&self, task_id: TaskId) -> Result<Task, TaskStoreError> {
        self.with_task(task_id, |task| {
            task.dynamic_analysis_completed = true;
            task.clone()
        })
    }
}

#[cfg(test)]
#[path = "task_store_tests.rs"]
mod tests;
