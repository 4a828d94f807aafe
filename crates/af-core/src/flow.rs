// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One intercepted HTTP(S) request record, as appended by the proxy.

use serde::{Deserialize, Serialize};

/// A single captured request. Appended by the proxy; never mutated.
///
/// `timestamp` is float seconds (matching the proxy's native clock
/// representation) rather than an integer, so sub-second ordering within a
/// busy activity survives attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub timestamp: f64,
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl FlowRecord {
    /// Whether this record's timestamp falls within `[start, end]` (both
    /// bounds inclusive, per §4.3).
    pub fn in_time_range(&self, start: f64, end: f64) -> bool {
        self.timestamp >= start && self.timestamp <= end
    }

    /// Whether this record is attributable to `package`: matches on
    /// `package_name` when present, otherwise always true (older capture
    /// formats carried no package tag — time range alone attributes them).
    pub fn matches_package(&self, package: &str) -> bool {
        match &self.package_name {
            Some(p) => p == package,
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
