// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-activity interaction detail persistence: one row per
//! `(task_id, activity)` pair, recorded as exploration finishes with each
//! activity (§4.4 step 13, §4.12).

use af_core::{ActivityDetail, TaskId};
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait ActivityStore: Send + Sync + 'static {
    async fn record(&self, detail: ActivityDetail);
    async fn list_for_task(&self, task_id: TaskId) -> Vec<ActivityDetail>;
}

#[derive(Default)]
pub struct InProcessActivityStore {
    details: parking_lot::Mutex<HashMap<TaskId, Vec<ActivityDetail>>>,
}

impl InProcessActivityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActivityStore for InProcessActivityStore {
    async fn record(&self, detail: ActivityDetail) {
        self.details.lock().entry(detail.task_id).or_default().push(detail);
    }

    async fn list_for_task(&self, task_id: TaskId) -> Vec<ActivityDetail> {
        self.details.lock().get(&task_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "activity_store_tests.rs"]
mod tests;
