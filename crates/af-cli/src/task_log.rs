// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local task record log backing the CLI's standalone mode (§4.13).
//!
//! `af task submit` has no live daemon to hand the task to when run on its
//! own, so it appends a JSON-lines record under the configured state
//! directory instead. `af task status`/`af task list` read that same file.
//! A deployment that runs `afd` in-process would instead share its
//! `TaskStore` handle directly; this file-backed log exists only for the
//! CLI-without-a-daemon case.

use af_core::{Task, TaskId};
use af_daemon::Config;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

pub fn log_path(config: &Config) -> PathBuf {
    config.state_dir.join("cli_tasks.jsonl")
}

pub fn append(config: &Config, task: &Task) -> std::io::Result<()> {
    let path = log_path(config);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(task).map_err(std::io::Error::other)?;
    writeln!(file, "{line}")
}

/// Every record ever appended for a task_id, keeping only the most
/// recently appended one.
pub fn read_all(config: &Config) -> Vec<Task> {
    let path = log_path(config);
    let Ok(text) = std::fs::read_to_string(&path) else {
        return Vec::new();
    };

    let mut by_id: HashMap<TaskId, Task> = HashMap::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        if let Ok(task) = serde_json::from_str::<Task>(line) {
            by_id.insert(task.task_id, task);
        }
    }
    by_id.into_values().collect()
}

pub fn find(config: &Config, task_id: TaskId) -> Option<Task> {
    read_all(config).into_iter().find(|task| task.task_id == task_id)
}

#[cfg(test)]
#[path = "task_log_tests.rs"]
mod tests;
