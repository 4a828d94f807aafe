// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use af_adapters::{FakeDeviceClient, FakeInstrumentationClient, FakeProxyGatewayClient};
use af_core::{Arch, FakeClock, SystemClock, Task, TaskId};
use af_storage::{InProcessActivityStore, InProcessStaticReportStore, InProcessTaskStore, InProcessUnpackResultStore, TaskStore};
use crate::worker_pool::TaskRunner;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use zip::write::SimpleFileOptions;

const MAIN_UI_DUMP: &str = r#"<hierarchy><node text="" bounds="[0,0][600,2200]"><node text="Home" clickable="true" bounds="[0,2100][200,2200]"/><node text="Category" clickable="true" bounds="[200,2100][400,2200]"/><node text="Cart" clickable="true" bounds="[400,2100][600,2200]"/></node></hierarchy>"#;

fn build_fixture_apk(package: &str) -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut writer = zip::ZipWriter::new(file.reopen().unwrap());
    let options = SimpleFileOptions::default();

    writer.start_file("lib/arm64-v8a/libfoo.so", options).unwrap();
    writer.write_all(b"\x7fELF").unwrap();

    let mut manifest_body = format!(r#"package="{package}""#);
    manifest_body.push('\0');
    manifest_body.push_str("android.permission.INTERNET\0");
    writer.start_file("AndroidManifest.xml", options).unwrap();
    let bytes: Vec<u8> = manifest_body.bytes().collect();
    writer.write_all(&bytes).unwrap();
    writer.finish().unwrap();

    file
}

struct RecordingCallback(mpsc::UnboundedSender<TaskId>);

#[async_trait]
impl DomainAnalysisCallback for RecordingCallback {
    async fn on_both_complete(&self, task_id: TaskId) {
        let _ = self.0.send(task_id);
    }
}

fn test_config(capture_dir: &std::path::Path) -> OrchestratorConfig {
    OrchestratorConfig {
        device_wait_timeout: Duration::from_secs(5),
        background_monitor_window: Duration::from_millis(1),
        capture_dir: capture_dir.join("captures"),
        screenshot_dir: capture_dir.join("screenshots"),
        log_dir: capture_dir.join("logs"),
        ..OrchestratorConfig::default()
    }
}

fn build_orchestrator(
    apk_package: &str,
    workdir: &std::path::Path,
    shutdown: CancellationToken,
) -> (Orchestrator<FakeClock>, Arc<dyn TaskStore>, tempfile::NamedTempFile) {
    let apk = build_fixture_apk(apk_package);
    let device_client = FakeDeviceClient::new();
    device_client.set_foreground("d1:5555", apk_package);
    device_client.set_ui_dump("d1:5555", MAIN_UI_DUMP);

    let clock = FakeClock::new();
    let device_pool = Arc::new(DevicePool::new(Arc::new(device_client.clone()), clock.clone()));
    device_pool.add(DeviceDescriptor {
        id: "d1".to_string(),
        adb_target: "d1:5555".to_string(),
        proxy_host: "10.0.0.1".to_string(),
        proxy_port: 8080,
        proxy_container: "proxy-d1".to_string(),
        proxy_api_port: 9090,
        instrumentation_host: None,
        arch: Arch::Arm,
    });

    let task_store: Arc<dyn TaskStore> = Arc::new(InProcessTaskStore::new());

    let orchestrator = Orchestrator::new(
        device_pool,
        Arc::new(device_client),
        Arc::new(FakeInstrumentationClient::new()),
        Arc::new(FakeProxyGatewayClient::new()),
        task_store.clone(),
        Arc::new(InProcessActivityStore::new()),
        Arc::new(InProcessStaticReportStore::new()),
        Arc::new(InProcessUnpackResultStore::new()),
        clock,
        shutdown,
        test_config(workdir),
    );

    (orchestrator, task_store, apk)
}

#[tokio::test]
async fn successful_run_reaches_collecting_at_95_and_fires_domain_callback() {
    let workdir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(workdir.path().join("screenshots")).unwrap();
    std::fs::create_dir_all(workdir.path().join("logs")).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (orchestrator, task_store, apk) = build_orchestrator("com.example.app", workdir.path(), CancellationToken::new());
    let orchestrator = orchestrator.with_domain_callback(Arc::new(RecordingCallback(tx)));

    let task = Task::new(apk.path());
    let task_id = task.task_id;
    task_store.insert(task.clone()).await.unwrap();

    let result = orchestrator.run(task).await;
    assert!(result.is_ok(), "run should succeed: {result:?}");

    let completed = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await.unwrap().unwrap();
    assert_eq!(completed, task_id);

    let stored = task_store.get(task_id).await.unwrap();
    assert_eq!(stored.status, TaskStatus::Collecting);
    assert_eq!(stored.progress_percent, 95);
    assert!(stored.static_analysis_completed);
    assert!(stored.dynamic_analysis_completed);
    assert_eq!(stored.package_name, Some("com.example.app".to_string()));
}

#[tokio::test]
async fn package_mismatch_fails_the_task_without_retry() {
    let workdir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(workdir.path().join("screenshots")).unwrap();
    std::fs::create_dir_all(workdir.path().join("logs")).unwrap();

    // The fixture APK's manifest declares "com.example.app", but the fake
    // device client's install call always reports "com.example.app" back
    // too -- force a mismatch by asking for a different expected package.
    let (orchestrator, task_store, apk) = build_orchestrator("com.other.app", workdir.path(), CancellationToken::new());

    let task = Task::new(apk.path());
    let task_id = task.task_id;
    task_store.insert(task.clone()).await.unwrap();

    let result = orchestrator.run(task).await;
    assert!(result.is_err());

    let stored = task_store.get(task_id).await.unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
}

#[tokio::test]
async fn cancelled_before_device_acquisition_marks_task_canceled() {
    let workdir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(workdir.path().join("screenshots")).unwrap();
    std::fs::create_dir_all(workdir.path().join("logs")).unwrap();

    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let (orchestrator, task_store, apk) = build_orchestrator("com.example.app", workdir.path(), shutdown);

    let task = Task::new(apk.path());
    let task_id = task.task_id;
    task_store.insert(task.clone()).await.unwrap();

    let result = orchestrator.run(task).await;
    assert!(result.is_ok());

    let stored = task_store.get(task_id).await.unwrap();
    assert_eq!(stored.status, TaskStatus::Canceled);
}

#[tokio::test]
async fn completion_callback_drives_the_final_completed_transition() {
    let workdir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(workdir.path().join("screenshots")).unwrap();
    std::fs::create_dir_all(workdir.path().join("logs")).unwrap();

    let (orchestrator, task_store, apk) = build_orchestrator("com.example.app", workdir.path(), CancellationToken::new());
    let orchestrator = orchestrator.with_domain_callback(Arc::new(CompletionCallback::new(task_store.clone(), SystemClock)));

    let task = Task::new(apk.path());
    let task_id = task.task_id;
    task_store.insert(task.clone()).await.unwrap();

    let result = orchestrator.run(task).await;
    assert!(result.is_ok(), "run should succeed: {result:?}");

    // The barrier's callback runs detached; give it a moment to land.
    let stored = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let stored = task_store.get(task_id).await.unwrap();
            if stored.status == TaskStatus::Completed {
                return stored;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(stored.progress_percent, 100);
    assert!(stored.completed_at_ms.is_some());
}

#[test]
fn instrumentation_target_falls_back_to_frida_default_port() {
    let descriptor = DeviceDescriptor {
        id: "d1".to_string(),
        adb_target: "d1:5555".to_string(),
        proxy_host: "10.0.0.1".to_string(),
        proxy_port: 8080,
        proxy_container: "proxy-d1".to_string(),
        proxy_api_port: 9090,
        instrumentation_host: Some("10.0.0.5".to_string()),
        arch: Arch::Arm,
    };
    match Orchestrator::<SystemClock>::instrumentation_target(&descriptor) {
        InstrumentationTarget::Network { host, port } => {
            assert_eq!(host, "10.0.0.5");
            assert_eq!(port, 27042);
        }
        InstrumentationTarget::Usb => panic!("expected network target"),
    }
}

#[test]
fn instrumentation_target_is_usb_when_host_absent() {
    let descriptor = DeviceDescriptor {
        id: "d1".to_string(),
        adb_target: "d1:5555".to_string(),
        proxy_host: "10.0.0.1".to_string(),
        proxy_port: 8080,
        proxy_container: "proxy-d1".to_string(),
        proxy_api_port: 9090,
        instrumentation_host: None,
        arch: Arch::Arm,
    };
    assert!(matches!(Orchestrator::<SystemClock>::instrumentation_target(&descriptor), InstrumentationTarget::Usb));
}
