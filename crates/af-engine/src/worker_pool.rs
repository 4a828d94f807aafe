// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded worker pool draining a task channel (§4.11). The pool itself is
//! generic over the per-task runner so the orchestrator's full dependency
//! graph never has to be threaded through this module.

use async_trait::async_trait;
use af_core::{Task, TaskOutcome};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// One unit of work handed to a worker: the task plus an optional
/// completion channel for [`WorkerPool::submit_and_wait`] callers.
struct Job {
    task: Task,
    done: Option<oneshot::Sender<Result<(), TaskOutcome>>>,
}

/// Runs a single task to completion or a classified failure. Implemented
/// by the orchestrator; kept as a trait so the pool's tests can substitute
/// a fake runner.
#[async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    async fn run(&self, task: Task) -> Result<(), TaskOutcome>;
}

pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` workers, each looping on the shared job
    /// channel until it is closed by [`WorkerPool::stop`].
    pub fn start(worker_count: usize, channel_capacity: usize, runner: Arc<dyn TaskRunner>) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>(channel_capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..worker_count.max(1))
            .map(|worker_id| {
                let receiver = receiver.clone();
                let runner = runner.clone();
                tokio::spawn(async move {
                    loop {
                        let job = {
                            let mut receiver = receiver.lock().await;
                            receiver.recv().await
                        };
                        let Some(job) = job else { break };
                        let task_id = job.task.task_id;
                        let result = runner.run(job.task).await;
                        if let Err(outcome) = &result {
                            if outcome.is_retryable() {
                                tracing::info!(%task_id, worker_id, "task retryable, re-enqueue left to upstream queue broker");
                            } else {
                                tracing::warn!(%task_id, worker_id, %outcome, "task failed");
                            }
                        }
                        if let Some(done) = job.done {
                            let _ = done.send(result);
                        }
                    }
                })
            })
            .collect();

        Self { sender, handles }
    }

    /// Enqueue a task; returns once it is accepted onto the channel, not
    /// once it finishes running.
    pub async fn submit(&self, task: Task) -> Result<(), Task> {
        let job = Job { task, done: None };
        self.sender.send(job).await.map_err(|e| e.0.task)
    }

    /// Enqueue a task and wait for its result.
    pub async fn submit_and_wait(&self, task: Task) -> Result<(), TaskOutcome> {
        let task_id = task.task_id;
        let (tx, rx) = oneshot::channel();
        let job = Job { task, done: Some(tx) };
        if self.sender.send(job).await.is_err() {
            return Err(TaskOutcome::Failed {
                task_id,
                kind: af_core::FailureKind::Unknown,
                message: "worker pool is stopped".to_string(),
            });
        }
        rx.await.unwrap_or_else(|_| {
            Err(TaskOutcome::Failed {
                task_id,
                kind: af_core::FailureKind::Unknown,
                message: "worker dropped the completion channel".to_string(),
            })
        })
    }

    /// Close the channel and wait for every worker to drain and exit.
    pub async fn stop(self) {
        drop(self.sender);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
#[path = "worker_pool_tests.rs"]
mod tests;
