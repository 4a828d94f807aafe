// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use af_core::FailureKind;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

struct RecordingRunner {
    ran: Arc<Mutex<Vec<String>>>,
    fail_next: Arc<AtomicUsize>,
}

#[async_trait]
impl TaskRunner for RecordingRunner {
    async fn run(&self, task: Task) -> Result<(), TaskOutcome> {
        self.ran.lock().push(task.apk_path.to_string_lossy().into_owned());
        if self.fail_next.load(Ordering::SeqCst) > 0 {
            self.fail_next.fetch_sub(1, Ordering::SeqCst);
            return Err(TaskOutcome::Failed {
                task_id: task.task_id,
                kind: FailureKind::AnalysisError,
                message: "boom".to_string(),
            });
        }
        Ok(())
    }
}

#[tokio::test]
async fn submit_and_wait_returns_runner_result() {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let runner = Arc::new(RecordingRunner { ran: ran.clone(), fail_next: Arc::new(AtomicUsize::new(0)) });
    let pool = WorkerPool::start(2, 8, runner);

    let task = Task::new("/tmp/a.apk");
    let result = pool.submit_and_wait(task).await;
    assert!(result.is_ok());
    assert_eq!(ran.lock().clone(), vec!["/tmp/a.apk"]);

    pool.stop().await;
}

#[tokio::test]
async fn submit_and_wait_surfaces_failure_outcome() {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let runner = Arc::new(RecordingRunner { ran, fail_next: Arc::new(AtomicUsize::new(1)) });
    let pool = WorkerPool::start(1, 8, runner);

    let task = Task::new("/tmp/b.apk");
    let result = pool.submit_and_wait(task).await;
    assert!(matches!(result, Err(TaskOutcome::Failed { kind: FailureKind::AnalysisError, .. })));

    pool.stop().await;
}

#[tokio::test]
async fn multiple_submits_all_run_exactly_once() {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let runner = Arc::new(RecordingRunner { ran: ran.clone(), fail_next: Arc::new(AtomicUsize::new(0)) });
    let pool = WorkerPool::start(3, 16, runner);

    for i in 0..10 {
        pool.submit(Task::new(format!("/tmp/{i}.apk"))).await.unwrap();
    }
    pool.stop().await;

    assert_eq!(ran.lock().len(), 10);
}
