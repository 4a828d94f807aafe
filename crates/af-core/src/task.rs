// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identifier and state machine (§4.4).

use crate::failure::FailureKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for one analysis task.
    pub struct TaskId("tsk-");
}

/// Status of a task's position in the orchestrator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Installing,
    Running,
    Collecting,
    Completed,
    Failed,
    Canceled,
}

crate::simple_display! {
    TaskStatus {
        Queued => "queued",
        Installing => "installing",
        Running => "running",
        Collecting => "collecting",
        Completed => "completed",
        Failed => "failed",
        Canceled => "canceled",
    }
}

impl TaskStatus {
    /// Terminal states: no further transitions happen once reached.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Canceled)
    }
}

/// Persistent record for one queued analysis task (§3).
///
/// Created by the queue producer; mutated exclusively by the orchestrator
/// assigned to it, plus the two atomic "mark completed" updates described
/// in §4.10 (applied through the task store, never by mutating this struct
/// directly once it has been handed to a store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub apk_path: PathBuf,
    #[serde(default)]
    pub package_name: Option<String>,
    pub status: TaskStatus,
    pub current_step: String,
    pub progress_percent: u8,
    pub retry_count: u32,
    #[serde(default)]
    pub failure_type: Option<FailureKind>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub static_analysis_completed: bool,
    #[serde(default)]
    pub dynamic_analysis_completed: bool,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub started_at_ms: Option<u64>,
    #[serde(default)]
    pub completed_at_ms: Option<u64>,
    /// Cooperative cancel flag. Checked by the orchestrator's activity
    /// traversal loop and at every status transition point (§5).
    #[serde(default)]
    pub should_stop: bool,
}

impl Task {
    pub fn new(apk_path: impl Into<PathBuf>) -> Self {
        Self {
            task_id: TaskId::new(),
            apk_path: apk_path.into(),
            package_name: None,
            status: TaskStatus::Queued,
            current_step: "queued".into(),
            progress_percent: 0,
            retry_count: 0,
            failure_type: None,
            error_message: None,
            static_analysis_completed: false,
            dynamic_analysis_completed: false,
            app_name: None,
            started_at_ms: None,
            completed_at_ms: None,
            should_stop: false,
        }
    }

    /// Whether both analysis pipelines have reported success — the
    /// precondition the completion barrier (§4.10) waits on.
    pub fn both_analyses_completed(&self) -> bool {
        self.static_analysis_completed && self.dynamic_analysis_completed
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            current_step: String = "queued",
        }
        set {
            apk_path: PathBuf = PathBuf::from("/tmp/app.apk"),
            status: TaskStatus = TaskStatus::Queued,
            progress_percent: u8 = 0,
            retry_count: u32 = 0,
            static_analysis_completed: bool = false,
            dynamic_analysis_completed: bool = false,
            started_at_ms: Option<u64> = None,
            completed_at_ms: Option<u64> = None,
            should_stop: bool = false,
        }
        option {
            failure_type: FailureKind = None,
            error_message: String = None,
            app_name: String = None,
            package_name: String = None,
        }
        computed {
            task_id: TaskId = TaskId::new(),
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
