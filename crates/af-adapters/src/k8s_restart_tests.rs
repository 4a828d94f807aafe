// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::fake::FakeDeviceRestarter;
use super::*;

#[tokio::test]
async fn restart_then_reinstall_records_both_calls() {
    let restarter = FakeDeviceRestarter::new();
    restarter.restart_container("device-07").await.unwrap();
    restarter.reinstall_certificate("device-07").await.unwrap();
    assert_eq!(restarter.calls(), vec!["restart device-07", "reinstall_cert device-07"]);
}
