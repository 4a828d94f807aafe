// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translate a raw orchestrator error into the one outcome envelope the
//! worker pool understands (§7, §4.11).

use af_core::{classify_error, max_retry, FailureKind, TaskId, TaskOutcome};
use std::path::Path;

/// Classify `message` and decide whether the task should be retried.
///
/// On the retryable path the caller (the orchestrator) is responsible for
/// having already incremented `retry_count` and reset the task's status to
/// `QUEUED` before this is invoked — this function only builds the
/// envelope, it never touches the task store.
pub fn outcome_for(task_id: TaskId, apk_path: &Path, retry_count: u32, message: impl Into<String>) -> TaskOutcome {
    let message = message.into();
    let kind = classify_error(&message);
    let ceiling = max_retry(kind);
    if kind.is_retryable() && retry_count < ceiling {
        TaskOutcome::Retryable { task_id, apk_path: apk_path.to_path_buf(), retry_count, max_retry: ceiling, kind, message }
    } else {
        TaskOutcome::Failed { task_id, kind, message }
    }
}

/// Pre-classify an error kind without building the full outcome, for
/// call sites that only need to decide retryability up front (e.g. the
/// device pool's `AllBusy`/`Unhealthy` path before a task has even been
/// bound to a device).
pub fn is_retryable(kind: FailureKind, retry_count: u32) -> bool {
    kind.is_retryable() && retry_count < max_retry(kind)
}

#[cfg(test)]
#[path = "retry_policy_tests.rs"]
mod tests;
