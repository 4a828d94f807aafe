// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Packer detection and dynamic DEX unpacking (§4.8).

use af_core::{TaskId, UnpackResult, UnpackStatus};
use std::time::Duration;
use thiserror::Error;

const DEX_MAGIC: [&[u8]; 2] = [b"dex\n", b"dey\n"];
const MIN_DEX_SIZE: usize = 112;
pub const UNPACK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum PackerError {
    #[error("unpacker dumper timed out after {0:?}")]
    Timeout(Duration),
    #[error("no valid DEX files recovered")]
    NoValidDex,
    #[error("i/o error during unpack: {0}")]
    Io(#[from] std::io::Error),
}

/// One weighted piece of evidence a [`PackerRule`] contributes.
#[derive(Debug, Clone)]
pub struct Signals<'a> {
    pub native_lib_names: &'a [String],
    pub file_paths: &'a [String],
    pub dex_total_size: u64,
    pub native_total_size: u64,
}

/// A prioritized detection rule. Rules are evaluated in declaration order;
/// the first one whose accumulated confidence reaches 0.4 wins (§4.8).
pub struct PackerRule {
    pub name: &'static str,
    pub dumpable: bool,
    evaluate: fn(&Signals) -> f32,
}

fn strip_version_suffix(name: &str) -> String {
    name.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.' || c == '-').to_string()
}

fn evaluate_known_native_packers(signals: &Signals) -> f32 {
    const KNOWN: &[&str] = &["libjiagu", "libshell", "libsecexe", "libnesec"];
    let mut confidence = 0.0f32;
    for lib in signals.native_lib_names {
        let stripped = strip_version_suffix(lib);
        if KNOWN.iter().any(|known| stripped.contains(known)) {
            confidence += 0.5;
        }
    }
    confidence.min(1.0)
}

fn evaluate_suspicious_paths(signals: &Signals) -> f32 {
    const SUSPICIOUS: &[&str] = &["/assets/secData", "/assets/.jiagu", "/lib/armeabi/libprotectClass"];
    let mut confidence = 0.0f32;
    for path in signals.file_paths {
        if SUSPICIOUS.iter().any(|s| path.contains(s)) {
            confidence += 0.45;
        }
    }
    confidence.min(1.0)
}

fn evaluate_dex_too_small(signals: &Signals) -> f32 {
    if signals.dex_total_size > 0 && signals.dex_total_size < 20_000 {
        0.4
    } else {
        0.0
    }
}

fn evaluate_native_too_large(signals: &Signals) -> f32 {
    if signals.native_total_size > 50_000_000 {
        0.4
    } else {
        0.0
    }
}

/// Rules in priority order: more specific evidence first.
pub fn detection_rules() -> Vec<PackerRule> {
    vec![
        PackerRule { name: "known_native_packer", dumpable: true, evaluate: evaluate_known_native_packers },
        PackerRule { name: "suspicious_asset_path", dumpable: true, evaluate: evaluate_suspicious_paths },
        PackerRule { name: "dex_too_small", dumpable: true, evaluate: evaluate_dex_too_small },
        PackerRule { name: "native_too_large", dumpable: false, evaluate: evaluate_native_too_large },
    ]
}

/// Result of running the detector over one APK's signals.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub matched_rule: Option<&'static str>,
    pub confidence: f32,
    pub dumpable: bool,
}

pub fn detect(signals: &Signals) -> DetectionOutcome {
    for rule in detection_rules() {
        let confidence = (rule.evaluate)(signals).clamp(0.0, 1.0);
        if confidence >= 0.4 {
            return DetectionOutcome { matched_rule: Some(rule.name), confidence, dumpable: rule.dumpable };
        }
    }
    DetectionOutcome { matched_rule: None, confidence: 0.0, dumpable: false }
}

/// Validate one pulled DEX candidate by magic bytes and minimum size.
pub fn is_valid_dex(bytes: &[u8]) -> bool {
    bytes.len() >= MIN_DEX_SIZE && DEX_MAGIC.iter().any(|magic| bytes.starts_with(magic))
}

/// Merge multiple valid DEX byte buffers via an external merging tool's
/// output path; if the merge step fails, fall back to the first DEX.
pub fn choose_merge_fallback(dex_paths: &[String]) -> Option<String> {
    dex_paths.first().cloned()
}

/// Build the persisted [`UnpackResult`] for a finished (or skipped) unpack
/// attempt. Unpack failure never fails the owning task (§4.8) — callers
/// persist this record and continue regardless of `status`.
pub fn not_dumpable_result(task_id: TaskId) -> UnpackResult {
    UnpackResult { status: UnpackStatus::NotRun, ..UnpackResult::not_run(task_id) }
}

pub fn failed_result(task_id: TaskId, error: impl Into<String>) -> UnpackResult {
    UnpackResult { status: UnpackStatus::Failed, error: Some(error.into()), ..UnpackResult::not_run(task_id) }
}

pub fn dumped_result(
    task_id: TaskId,
    matched_rule: &str,
    confidence: f32,
    dumped_dex_paths: Vec<String>,
    merged_dex_path: Option<String>,
) -> UnpackResult {
    UnpackResult {
        task_id,
        status: UnpackStatus::Dumped,
        matched_rule: Some(matched_rule.to_string()),
        confidence,
        dumped_dex_paths,
        merged_dex_path,
        error: None,
    }
}

#[cfg(test)]
#[path = "packer_tests.rs"]
mod tests;
