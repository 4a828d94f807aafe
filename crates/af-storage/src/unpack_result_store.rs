// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamic-unpacking outcome persistence: one row per task (§4.8, §4.12).
//! Unpack failure is represented distinctly from "never ran"; neither
//! fails the owning task.

use af_core::{TaskId, UnpackResult};
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait UnpackResultStore: Send + Sync + 'static {
    async fn upsert(&self, result: UnpackResult);
    async fn get(&self, task_id: TaskId) -> Option<UnpackResult>;
}

#[derive(Default)]
pub struct InProcessUnpackResultStore {
    results: parking_lot::Mutex<HashMap<TaskId, UnpackResult>>,
}

impl InProcessUnpackResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnpackResultStore for InProcessUnpackResultStore {
    async fn upsert(&self, result: UnpackResult) {
        self.results.lock().insert(result.task_id, result);
    }

    async fn get(&self, task_id: TaskId) -> Option<UnpackResult> {
        self.results.lock().get(&task_id).cloned()
    }
}

#[cfg(test)]
#[path = "unpack_result_store_tests.rs"]
mod tests;
