// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental reader over a task's append-only JSON-lines capture file
//! (§4.3, §6).
//!
//! Records are content-identified by line position, so `incremental` is
//! idempotent and restartable across polling calls: a cursor is just "how
//! many lines were consumed last time."

use af_core::FlowRecord;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttributorError {
    #[error("failed to read capture file: {0}")]
    Io(#[from] std::io::Error),
}

/// Full read of a capture file. Malformed lines are skipped with a logged
/// line number rather than aborting the read (§6: "partial last line
/// tolerated").
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<FlowRecord>, AttributorError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_lines(&contents))
}

/// Resume from `start_line` (0-indexed, exclusive of lines already
/// consumed). Returns the newly parsed records and the new cursor position.
pub fn incremental(path: impl AsRef<Path>, start_line: usize) -> Result<(Vec<FlowRecord>, usize), AttributorError> {
    let contents = std::fs::read_to_string(path)?;
    let all_lines: Vec<&str> = contents.lines().collect();
    let new_lines = all_lines.iter().skip(start_line);
    let mut records = Vec::new();
    for (offset, line) in new_lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<FlowRecord>(line) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(line_number = start_line + offset, error = %err, "skipping malformed flow record");
            }
        }
    }
    Ok((records, all_lines.len()))
}

fn parse_lines(contents: &str) -> Vec<FlowRecord> {
    let mut records = Vec::new();
    for (line_number, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<FlowRecord>(line) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(line_number, error = %err, "skipping malformed flow record");
            }
        }
    }
    records
}

/// Inclusive-bounds filter on `timestamp`.
pub fn filter_by_time(records: &[FlowRecord], t_start: f64, t_end: f64) -> Vec<FlowRecord> {
    records.iter().filter(|r| r.in_time_range(t_start, t_end)).cloned().collect()
}

/// Time filter plus package match; records without a `package_name` tag
/// (older capture formats) pass on time alone.
pub fn filter_by_time_and_package(records: &[FlowRecord], t_start: f64, t_end: f64, pkg: &str) -> Vec<FlowRecord> {
    records.iter().filter(|r| r.in_time_range(t_start, t_end) && r.matches_package(pkg)).cloned().collect()
}

#[cfg(test)]
#[path = "attributor_tests.rs"]
mod tests;
