// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static-analysis report persistence: one row per task, upserted by the
//! static analyzer facade (§4.9, §4.12).

use af_core::{StaticReport, TaskId};
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait StaticReportStore: Send + Sync + 'static {
    async fn upsert(&self, report: StaticReport);
    async fn get(&self, task_id: TaskId) -> Option<StaticReport>;
}

#[derive(Default)]
pub struct InProcessStaticReportStore {
    reports: parking_lot::Mutex<HashMap<TaskId, StaticReport>>,
}

impl InProcessStaticReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StaticReportStore for InProcessStaticReportStore {
    async fn upsert(&self, report: StaticReport) {
        self.reports.lock().insert(report.task_id, report);
    }

    async fn get(&self, task_id: TaskId) -> Option<StaticReport> {
        self.reports.lock().get(&task_id).cloned()
    }
}

#[cfg(test)]
#[path = "static_report_store_tests.rs"]
mod tests;
