// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn detail(task_id: TaskId, activity: &str) -> ActivityDetail {
    ActivityDetail {
        task_id,
        activity: activity.to_string(),
        is_core: false,
        launch_failed: false,
        start_time: 0.0,
        end_time: 1.0,
        flow_count: 0,
    }
}

#[tokio::test]
async fn records_accumulate_per_task_in_order() {
    let store = InProcessActivityStore::new();
    let task_id = TaskId::new();
    store.record(detail(task_id, "com.example.app.MainActivity")).await;
    store.record(detail(task_id, "com.example.app.DetailActivity")).await;

    let listed = store.list_for_task(task_id).await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].activity, "com.example.app.MainActivity");
    assert_eq!(listed[1].activity, "com.example.app.DetailActivity");
}

#[tokio::test]
async fn unrelated_task_has_no_records() {
    let store = InProcessActivityStore::new();
    store.record(detail(TaskId::new(), "com.example.app.MainActivity")).await;
    assert!(store.list_for_task(TaskId::new()).await.is_empty());
}
