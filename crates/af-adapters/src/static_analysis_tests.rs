// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;
use zip::write::SimpleFileOptions;

fn build_fixture_apk(lib_dirs: &[&str], manifest_permissions: &[&str]) -> tempfile::NamedTempFile {
    build_fixture_apk_with_package(lib_dirs, manifest_permissions, "com.example.app")
}

fn build_fixture_apk_with_package(
    lib_dirs: &[&str],
    manifest_permissions: &[&str],
    package: &str,
) -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut writer = zip::ZipWriter::new(file.reopen().unwrap());
    let options = SimpleFileOptions::default();

    for dir in lib_dirs {
        writer.start_file(format!("{dir}/libfoo.so"), options).unwrap();
        writer.write_all(b"\x7fELF").unwrap();
    }

    let mut manifest_body = format!(r#"package="{package}""#);
    manifest_body.push('\0');
    for perm in manifest_permissions {
        manifest_body.push_str(perm);
        manifest_body.push('\0');
    }
    manifest_body.push_str("MainActivity\0SyncService\0");
    writer.start_file("AndroidManifest.xml", options).unwrap();
    let bytes: Vec<u8> = manifest_body.bytes().collect();
    writer.write_all(&bytes).unwrap();
    writer.finish().unwrap();

    file
}

#[test]
fn fast_stage_extracts_package_name_from_manifest() {
    let apk = build_fixture_apk_with_package(&["lib/arm64-v8a"], &[], "com.example.demo");
    let result = run_fast_stage(apk.path()).unwrap();
    assert_eq!(result.package_name, Some("com.example.demo".to_string()));
}

#[test]
fn packer_signals_scan_aggregates_native_and_dex_sizes() {
    let apk = build_fixture_apk(&["lib/arm64-v8a"], &[]);
    let source = scan_apk_for_packer_signals(apk.path()).unwrap();
    assert_eq!(source.native_lib_names, vec!["libfoo.so".to_string()]);
    assert!(source.native_total_size > 0);
    assert_eq!(source.dex_total_size, 0);
}

#[test]
fn fast_stage_detects_arm_only_arch() {
    let apk = build_fixture_apk(&["lib/arm64-v8a"], &["android.permission.INTERNET"]);
    let result = run_fast_stage(apk.path()).unwrap();
    assert_eq!(result.arch, Arch::Arm);
    assert_eq!(result.permissions, vec!["android.permission.INTERNET"]);
}

#[test]
fn fast_stage_detects_any_arch_when_both_present() {
    let apk = build_fixture_apk(&["lib/arm64-v8a", "lib/x86_64"], &[]);
    let result = run_fast_stage(apk.path()).unwrap();
    assert_eq!(result.arch, Arch::Any);
}

#[test]
fn fast_stage_dedupes_permissions() {
    let apk = build_fixture_apk(&["lib/armeabi-v7a"], &["android.permission.INTERNET", "android.permission.INTERNET"]);
    let result = run_fast_stage(apk.path()).unwrap();
    assert_eq!(result.permission_count, 1);
}

#[test]
fn should_run_deep_stage_honors_force_flag() {
    let fast = FastStageResult {
        arch: Arch::Any,
        sha256: "abc".into(),
        package_name: None,
        activity_count: 1,
        service_count: 0,
        permission_count: 1,
        permissions: vec![],
    };
    assert!(should_run_deep_stage(&fast, 100, true, 1_000_000, 50, 50));
}

#[test]
fn should_run_deep_stage_honors_thresholds() {
    let fast = FastStageResult {
        arch: Arch::Any,
        sha256: "abc".into(),
        package_name: None,
        activity_count: 60,
        service_count: 0,
        permission_count: 1,
        permissions: vec![],
    };
    assert!(should_run_deep_stage(&fast, 100, false, 1_000_000, 50, 50));
    assert!(!should_run_deep_stage(&fast, 100, false, 1_000_000, 100, 100));
}

/// A worker that echoes one JSON-lines response per request line, forever.
/// Models §6's pooled protocol without depending on a real deep analyzer.
fn echo_worker_script() -> &'static str {
    r#"while IFS= read -r line; do echo "{\"ok\":true}"; done"#
}

#[tokio::test]
async fn pooled_dispatch_round_trips_through_a_long_lived_worker() {
    let pool = DeepAnalysisPool::spawn_with_args("sh", vec!["-c".to_string(), echo_worker_script().to_string()], 1).unwrap();
    let result = pool.dispatch("/tmp/app.apk").await.unwrap();
    assert_eq!(result, serde_json::json!({"ok": true}));
}

#[tokio::test]
async fn pooled_dispatch_reuses_the_worker_across_requests() {
    let pool = DeepAnalysisPool::spawn_with_args("sh", vec!["-c".to_string(), echo_worker_script().to_string()], 1).unwrap();
    pool.dispatch("/tmp/a.apk").await.unwrap();
    pool.dispatch("/tmp/b.apk").await.unwrap();
    assert_eq!(pool.worker_count(), 1);
}

#[tokio::test]
async fn pooled_dispatch_discards_a_worker_that_exits_without_responding() {
    let pool = DeepAnalysisPool::spawn_with_args("sh", vec!["-c".to_string(), "exit 0".to_string()], 1).unwrap();
    let result = pool.dispatch("/tmp/app.apk").await;
    assert!(result.is_err());
}

#[test]
fn report_from_fast_stage_never_marks_deep_analysis_ran() {
    let fast = FastStageResult {
        arch: Arch::Any,
        sha256: "abc".into(),
        package_name: None,
        activity_count: 1,
        service_count: 0,
        permission_count: 0,
        permissions: vec![],
    };
    let report = report_from_fast_stage(TaskId::new(), Some("com.a.b".into()), &fast);
    assert!(!report.deep_analysis_ran);
    assert_eq!(report.status, StaticStatus::Completed);
}
