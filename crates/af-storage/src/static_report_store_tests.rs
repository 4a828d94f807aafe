// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use af_core::StaticStatus;

#[tokio::test]
async fn upsert_then_get_round_trips() {
    let store = InProcessStaticReportStore::new();
    let task_id = TaskId::new();
    store.upsert(StaticReport::not_run(task_id)).await;
    let fetched = store.get(task_id).await.unwrap();
    assert_eq!(fetched.status, StaticStatus::NotRun);
}

#[tokio::test]
async fn get_missing_report_returns_none() {
    let store = InProcessStaticReportStore::new();
    assert!(store.get(TaskId::new()).await.is_none());
}

#[tokio::test]
async fn upsert_replaces_prior_report_for_same_task() {
    let store = InProcessStaticReportStore::new();
    let task_id = TaskId::new();
    store.upsert(StaticReport::not_run(task_id)).await;
    let mut completed = StaticReport::not_run(task_id);
    completed.status = StaticStatus::Completed;
    completed.activity_count = 5;
    store.upsert(completed).await;

    let fetched = store.get(task_id).await.unwrap();
    assert_eq!(fetched.status, StaticStatus::Completed);
    assert_eq!(fetched.activity_count, 5);
}
