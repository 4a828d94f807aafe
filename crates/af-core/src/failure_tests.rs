// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    install_failed_conflicting_provider = { "INSTALL_FAILED_CONFLICTING_PROVIDER", FailureKind::InstallFailed },
    install_failed_lowercase            = { "install failed: bad signature", FailureKind::InstallFailed },
    arm_only                            = { "no ARM device registered for this pool", FailureKind::ArmDeviceOnly },
    device_offline                      = { "error: device offline", FailureKind::ConnectionError },
    unauthorized                        = { "device unauthorized, check USB debugging", FailureKind::ConnectionError },
    frida_error                         = { "frida-server exited unexpectedly", FailureKind::InstrumentationError },
    inject_error                        = { "failed to inject tls-unpinning script", FailureKind::InstrumentationError },
    proxy_error                         = { "proxy set_output returned 500", FailureKind::ProxyError },
    certificate_error                   = { "certificate installation failed", FailureKind::ProxyError },
    device_timeout                      = { "all devices busy, device timed out waiting", FailureKind::DeviceTimeout },
    plain_timeout                       = { "context deadline exceeded", FailureKind::Timeout },
    analysis_error                      = { "deep analyzer exited with status 1", FailureKind::AnalysisError },
    unknown                             = { "something inexplicable happened", FailureKind::Unknown },
)]
fn classify(message: &str, expected: FailureKind) {
    assert_eq!(classify_error(message), expected);
}

// An "adb install" failure that also mentions connectivity must still
// classify as install_failed — install_failed is checked before
// connection_error specifically to cover this case (§7).
#[test]
fn install_failure_mentioning_connection_still_classifies_as_install_failed() {
    let msg = "adb install failed while device connection was flaky";
    assert_eq!(classify_error(msg), FailureKind::InstallFailed);
}

#[test]
fn classification_is_case_insensitive() {
    assert_eq!(classify_error("INSTALL FAILED"), FailureKind::InstallFailed);
    assert_eq!(classify_error("Install Failed"), FailureKind::InstallFailed);
}

#[yare::parameterized(
    arm_device_only = { FailureKind::ArmDeviceOnly, false },
    analysis_error = { FailureKind::AnalysisError, false },
    device_timeout = { FailureKind::DeviceTimeout, true },
    install_failed = { FailureKind::InstallFailed, true },
    unknown = { FailureKind::Unknown, true },
)]
fn retryability(kind: FailureKind, expected: bool) {
    assert_eq!(kind.is_retryable(), expected);
}

#[test]
fn non_retryable_kinds_have_zero_ceiling() {
    assert_eq!(max_retry(FailureKind::ArmDeviceOnly), 0);
    assert_eq!(max_retry(FailureKind::AnalysisError), 0);
}

#[test]
fn install_failed_ceiling_matches_scenario_4() {
    // §8 scenario 4: cap of 2, third classification is terminal.
    assert_eq!(max_retry(FailureKind::InstallFailed), 2);
}
