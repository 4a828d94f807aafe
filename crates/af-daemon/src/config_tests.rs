// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::io::Write;

#[test]
fn default_config_has_sane_worker_count_and_state_dir() {
    let config = Config::default();
    assert_eq!(config.worker_count, 4);
    assert_eq!(config.adb_bin, "adb");
    assert!(config.device_pool.devices.is_empty());
    assert_eq!(config.device_pool.k8s_namespace, "apkfarm");
}

#[test]
fn from_file_parses_a_minimal_toml_fixture() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        worker_count = 8
        adb_bin = "/opt/android/adb"

        [device_pool]
        health_check_interval_secs = 30

        [[device_pool.devices]]
        id = "dev-1"
        adb_target = "emulator-5554"
        proxy_host = "10.0.0.1"
        proxy_port = 8080
        proxy_container = "mitmproxy-1"
        proxy_api_port = 8081
        arch = "arm"
        "#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.worker_count, 8);
    assert_eq!(config.adb_bin, "/opt/android/adb");
    assert_eq!(config.device_pool.health_check_interval_secs, 30);
    assert_eq!(config.device_pool.devices.len(), 1);
    assert_eq!(config.device_pool.devices[0].id, "dev-1");
    assert_eq!(config.device_pool.devices[0].instrumentation_host, None);
}

#[test]
fn from_file_reports_a_parse_error_for_invalid_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "this is not valid toml = = =").unwrap();

    let err = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn from_file_reports_a_read_error_for_a_missing_path() {
    let err = Config::from_file(Path::new("/nonexistent/apkfarm.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
#[serial(config_env)]
fn resolve_path_prefers_the_env_override() {
    std::env::set_var(ENV_CONFIG_PATH, "/tmp/apkfarm-override.toml");
    let resolved = Config::resolve_path();
    std::env::remove_var(ENV_CONFIG_PATH);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/apkfarm-override.toml")));
}

#[test]
#[serial(config_env)]
fn apply_env_overrides_updates_state_dir_log_dir_worker_count_and_adb_bin() {
    std::env::set_var(ENV_STATE_DIR, "/tmp/apkfarm-state");
    std::env::set_var(ENV_LOG_DIR, "/tmp/apkfarm-logs");
    std::env::set_var(ENV_WORKER_COUNT, "16");
    std::env::set_var(ENV_ADB_BIN, "/usr/local/bin/adb");

    let mut config = Config::default();
    config.apply_env_overrides();

    std::env::remove_var(ENV_STATE_DIR);
    std::env::remove_var(ENV_LOG_DIR);
    std::env::remove_var(ENV_WORKER_COUNT);
    std::env::remove_var(ENV_ADB_BIN);

    assert_eq!(config.state_dir, PathBuf::from("/tmp/apkfarm-state"));
    assert_eq!(config.logging.log_dir, PathBuf::from("/tmp/apkfarm-logs"));
    assert_eq!(config.worker_count, 16);
    assert_eq!(config.adb_bin, "/usr/local/bin/adb");
}

#[test]
#[serial(config_env)]
fn apply_env_overrides_ignores_an_unparseable_worker_count() {
    std::env::set_var(ENV_WORKER_COUNT, "not-a-number");
    let mut config = Config::default();
    let original = config.worker_count;
    config.apply_env_overrides();
    std::env::remove_var(ENV_WORKER_COUNT);

    assert_eq!(config.worker_count, original);
}

#[test]
fn orchestrator_config_folds_in_ui_and_static_analysis_settings() {
    let mut config = Config::default();
    config.ui.guidance_max_rounds = 42;
    config.ui.background_monitor_window_secs = 9;
    config.static_analysis.force_deep = true;
    config.static_analysis.deep_stage_size_threshold = 123;
    config.state_dir = PathBuf::from("/tmp/apkfarm-root");

    let orchestrator_config = config.orchestrator_config();

    assert_eq!(orchestrator_config.guidance.max_rounds, 42);
    assert_eq!(orchestrator_config.background_monitor_window, Duration::from_secs(9));
    assert!(orchestrator_config.force_deep_stage);
    assert_eq!(orchestrator_config.deep_stage_size_threshold, 123);
    assert_eq!(orchestrator_config.capture_dir, PathBuf::from("/tmp/apkfarm-root/captures"));
    assert_eq!(orchestrator_config.screenshot_dir, PathBuf::from("/tmp/apkfarm-root/screenshots"));
}

#[test]
fn save_to_file_round_trips_through_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/apkfarm.toml");

    let mut config = Config::default();
    config.worker_count = 11;
    config.save_to_file(&path).unwrap();

    let reloaded = Config::from_file(&path).unwrap();
    assert_eq!(reloaded.worker_count, 11);
}

#[test]
fn rest_policy_default_maps_device_pool_fields() {
    let mut config = Config::default();
    config.device_pool.default_rest_interval = 10;
    config.device_pool.default_rest_duration_secs = 120;

    let policy = config.rest_policy_default();
    assert_eq!(policy.interval, 10);
    assert_eq!(policy.duration, Duration::from_secs(120));
}
