// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task derived records: one row per task, upserted by their owning
//! pipeline (§3).

use crate::task::TaskId;
use serde::{Deserialize, Serialize};

/// Status of the static-analysis pipeline for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticStatus {
    NotRun,
    Running,
    Completed,
    Failed,
}

crate::simple_display! {
    StaticStatus {
        NotRun => "not_run",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Status of the dynamic-unpacking pipeline for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpackStatus {
    NotRun,
    Dumped,
    Failed,
}

crate::simple_display! {
    UnpackStatus {
        NotRun => "not_run",
        Dumped => "dumped",
        Failed => "failed",
    }
}

/// Static-analysis report for one task. Exactly one row per `task_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticReport {
    pub task_id: TaskId,
    pub status: StaticStatus,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub version_name: Option<String>,
    #[serde(default)]
    pub activity_count: u32,
    #[serde(default)]
    pub service_count: u32,
    #[serde(default)]
    pub permission_count: u32,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub deep_analysis_ran: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl StaticReport {
    pub fn not_run(task_id: TaskId) -> Self {
        Self {
            task_id,
            status: StaticStatus::NotRun,
            package_name: None,
            version_name: None,
            activity_count: 0,
            service_count: 0,
            permission_count: 0,
            permissions: Vec::new(),
            sha256: None,
            deep_analysis_ran: false,
            error: None,
        }
    }
}

/// Dynamic-unpacking outcome for one task. Exactly one row per `task_id`.
/// Unpack failure never fails the owning task (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnpackResult {
    pub task_id: TaskId,
    pub status: UnpackStatus,
    #[serde(default)]
    pub matched_rule: Option<String>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub dumped_dex_paths: Vec<String>,
    #[serde(default)]
    pub merged_dex_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl UnpackResult {
    pub fn not_run(task_id: TaskId) -> Self {
        Self {
            task_id,
            status: UnpackStatus::NotRun,
            matched_rule: None,
            confidence: 0.0,
            dumped_dex_paths: Vec::new(),
            merged_dex_path: None,
            error: None,
        }
    }
}

/// Per-activity interaction detail: one row per `(task_id, activity)` pair,
/// recorded when exploration of that activity finishes (§4.4 step 13).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDetail {
    pub task_id: TaskId,
    pub activity: String,
    pub is_core: bool,
    pub launch_failed: bool,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub flow_count: usize,
}

#[cfg(test)]
#[path = "reports_tests.rs"]
mod tests;
