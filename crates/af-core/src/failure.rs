// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed failure taxonomy and textual error classification.
//!
//! Classification is deliberately textual (ordered substring matches on the
//! error message) rather than typed, because the collaborators that produce
//! the underlying errors — the device-control CLI, the instrumentation CLI,
//! the proxy HTTP API — only ever hand back freeform stderr/stdout text.

use serde::{Deserialize, Serialize};

/// Closed set of failure kinds a task can terminate with.
///
/// Order here doubles as classification priority when two substrings both
/// match: earlier-declared patterns in [`classify_error`] are checked first,
/// independent of this enum's declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DeviceTimeout,
    ArmDeviceOnly,
    ConnectionError,
    InstallFailed,
    InstrumentationError,
    ProxyError,
    Timeout,
    AnalysisError,
    Unknown,
}

crate::simple_display! {
    FailureKind {
        DeviceTimeout => "device_timeout",
        ArmDeviceOnly => "arm_device_only",
        ConnectionError => "connection_error",
        InstallFailed => "install_failed",
        InstrumentationError => "instrumentation_error",
        ProxyError => "proxy_error",
        Timeout => "timeout",
        AnalysisError => "analysis_error",
        Unknown => "unknown",
    }
}

impl FailureKind {
    /// Whether a failure of this kind is retryable at all.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::ArmDeviceOnly | FailureKind::AnalysisError)
    }
}

/// Maximum retry count allowed for a given failure kind, per §7.
///
/// Non-retryable kinds report 0: a caller that still checks `retry_count <
/// max_retry(kind)` before retrying gets the right answer without a special
/// case, satisfying invariant 5 in §8 uniformly.
pub fn max_retry(kind: FailureKind) -> u32 {
    match kind {
        FailureKind::DeviceTimeout => 3,
        FailureKind::ArmDeviceOnly => 0,
        FailureKind::ConnectionError => 3,
        FailureKind::InstallFailed => 2,
        FailureKind::InstrumentationError => 2,
        FailureKind::ProxyError => 2,
        FailureKind::Timeout => 3,
        FailureKind::AnalysisError => 0,
        FailureKind::Unknown => 1,
    }
}

/// Ordered (pattern, kind) table. Checked top-to-bottom; first match wins.
///
/// More specific patterns are listed before broader ones that would
/// otherwise shadow them — e.g. `"install failed"` is checked before the
/// generic `"connection"` pattern so an `adb install` failure that happens
/// to mention a disconnected device still classifies as `install_failed`.
const PATTERNS: &[(&str, FailureKind)] = &[
    ("arm device", FailureKind::ArmDeviceOnly),
    ("no arm device", FailureKind::ArmDeviceOnly),
    ("install failed", FailureKind::InstallFailed),
    ("install_failed", FailureKind::InstallFailed),
    ("failed to install", FailureKind::InstallFailed),
    ("frida", FailureKind::InstrumentationError),
    ("instrumentation", FailureKind::InstrumentationError),
    ("inject", FailureKind::InstrumentationError),
    ("proxy", FailureKind::ProxyError),
    ("certificate", FailureKind::ProxyError),
    ("device timed out", FailureKind::DeviceTimeout),
    ("no device available", FailureKind::DeviceTimeout),
    ("all devices busy", FailureKind::DeviceTimeout),
    ("device offline", FailureKind::ConnectionError),
    ("unauthorized", FailureKind::ConnectionError),
    ("connection refused", FailureKind::ConnectionError),
    ("connection reset", FailureKind::ConnectionError),
    ("not connected", FailureKind::ConnectionError),
    ("deadline exceeded", FailureKind::Timeout),
    ("timed out", FailureKind::Timeout),
    ("timeout", FailureKind::Timeout),
    ("analysis failed", FailureKind::AnalysisError),
    ("analyzer exited", FailureKind::AnalysisError),
];

/// Classify a raw error message into a [`FailureKind`] by ordered,
/// case-insensitive substring match. Falls back to [`FailureKind::Unknown`].
pub fn classify_error(message: &str) -> FailureKind {
    let haystack = message.to_lowercase();
    for (pattern, kind) in PATTERNS {
        if haystack.contains(pattern) {
            return *kind;
        }
    }
    FailureKind::Unknown
}

#[cfg(test)]
#[path = "failure_tests.rs"]
mod tests;
