// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{Arch, FailureKind, FlowRecord, Rect, Task, TaskId, TaskStatus, UiNode};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core domain types.
#[cfg(feature = "proptest")]
pub mod strategies {
    use super::*;
    use proptest::prelude::*;

    pub fn arb_arch() -> impl Strategy<Value = Arch> {
        prop_oneof![Just(Arch::Arm), Just(Arch::X86), Just(Arch::Any)]
    }

    pub fn arb_task_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::Queued),
            Just(TaskStatus::Installing),
            Just(TaskStatus::Running),
            Just(TaskStatus::Collecting),
            Just(TaskStatus::Completed),
            Just(TaskStatus::Failed),
            Just(TaskStatus::Canceled),
        ]
    }

    pub fn arb_failure_kind() -> impl Strategy<Value = FailureKind> {
        prop_oneof![
            Just(FailureKind::DeviceTimeout),
            Just(FailureKind::ArmDeviceOnly),
            Just(FailureKind::ConnectionError),
            Just(FailureKind::InstallFailed),
            Just(FailureKind::InstrumentationError),
            Just(FailureKind::ProxyError),
            Just(FailureKind::Timeout),
            Just(FailureKind::AnalysisError),
            Just(FailureKind::Unknown),
        ]
    }

    pub fn arb_rect() -> impl Strategy<Value = Rect> {
        (0i32..2000, 0i32..2000, 1i32..200, 1i32..200)
            .prop_map(|(x1, y1, w, h)| Rect { x1, y1, x2: x1 + w, y2: y1 + h })
    }
}

// ── Factory functions ────────────────────────────────────────────────────

pub fn task_with_status(status: TaskStatus) -> Task {
    let mut task = Task::new("/tmp/fixture.apk");
    task.status = status;
    task
}

pub fn failed_task(task_id: TaskId, kind: FailureKind, retry_count: u32) -> Task {
    let mut task = Task::new("/tmp/fixture.apk");
    task.task_id = task_id;
    task.status = TaskStatus::Failed;
    task.failure_type = Some(kind);
    task.retry_count = retry_count;
    task
}

pub fn flow_record(package: &str, timestamp: f64) -> FlowRecord {
    FlowRecord {
        timestamp,
        method: "GET".to_string(),
        scheme: "https".to_string(),
        host: "api.example.com".to_string(),
        port: 443,
        path: "/v1/ping".to_string(),
        url: "https://api.example.com/v1/ping".to_string(),
        package_name: Some(package.to_string()),
        task_id: None,
    }
}

pub fn leaf_node(text: &str, bounds: Rect) -> UiNode {
    UiNode { text: text.to_string(), bounds, ..Default::default() }
}
