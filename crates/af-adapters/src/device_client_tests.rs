// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::fake::FakeDeviceClient;
use super::*;

#[tokio::test]
async fn install_reports_success_on_literal_success_string() {
    let client = FakeDeviceClient::new();
    let outcome = client.install("emulator-5554", "/tmp/app.apk").await.unwrap();
    assert!(outcome.succeeded);
    assert!(outcome.raw_output.contains("Success"));
}

#[tokio::test]
async fn install_failure_is_visible_without_literal_success() {
    let client = FakeDeviceClient::new();
    client.fail_installs();
    let outcome = client.install("emulator-5554", "/tmp/app.apk").await.unwrap();
    assert!(!outcome.succeeded);
}

#[tokio::test]
async fn calls_are_recorded_in_order() {
    let client = FakeDeviceClient::new();
    client.connect("emulator-5554").await.unwrap();
    client.uninstall("emulator-5554", "com.a.b").await.unwrap();
    assert_eq!(client.calls(), vec!["connect emulator-5554", "uninstall emulator-5554 com.a.b"]);
}

#[tokio::test]
async fn foreground_package_reflects_fixture() {
    let client = FakeDeviceClient::new();
    client.set_foreground("emulator-5554", "com.a.b");
    assert_eq!(client.foreground_package("emulator-5554").await.unwrap().as_deref(), Some("com.a.b"));
}

#[tokio::test]
async fn foreground_package_absent_by_default() {
    let client = FakeDeviceClient::new();
    assert_eq!(client.foreground_package("emulator-5554").await.unwrap(), None);
}

#[tokio::test]
async fn installed_package_matches_the_expected_name_by_default() {
    let client = FakeDeviceClient::new();
    let detected = client.installed_package("emulator-5554", "com.example.app").await.unwrap();
    assert_eq!(detected.as_deref(), Some("com.example.app"));
}

#[tokio::test]
async fn installed_package_is_none_when_the_device_reports_a_different_package() {
    let client = FakeDeviceClient::new();
    client.set_installed_package("emulator-5554", "com.other.app");
    let detected = client.installed_package("emulator-5554", "com.example.app").await.unwrap();
    assert_eq!(detected, None);
}
