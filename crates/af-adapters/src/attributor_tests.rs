// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::NamedTempFile;

fn write_capture(lines: &[&str]) -> NamedTempFile {
    use std::io::Write;
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

fn record(timestamp: f64, package: Option<&str>) -> String {
    format!(
        r#"{{"timestamp":{timestamp},"method":"GET","scheme":"https","host":"h","port":443,"path":"/p","url":"https://h/p","package_name":{}}}"#,
        package.map(|p| format!("\"{p}\"")).unwrap_or_else(|| "null".into())
    )
}

#[test]
fn parse_file_skips_malformed_lines() {
    let good_a = record(1.0, Some("com.a.b"));
    let good_b = record(2.0, Some("com.a.b"));
    let file = write_capture(&[&good_a, "{not json", &good_b]);
    let records = parse_file(file.path()).unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn parse_file_tolerates_blank_lines() {
    let good = record(1.0, None);
    let file = write_capture(&[&good, ""]);
    let records = parse_file(file.path()).unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn incremental_resumes_from_cursor() {
    let a = record(1.0, None);
    let b = record(2.0, None);
    let file = write_capture(&[&a]);
    let (first, cursor) = incremental(file.path(), 0).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(cursor, 1);

    std::fs::write(file.path(), format!("{a}\n{b}\n")).unwrap();
    let (second, cursor2) = incremental(file.path(), cursor).unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(cursor2, 2);
}

#[test]
fn filter_by_time_is_inclusive_on_both_bounds() {
    let records = vec![
        serde_json::from_str(&record(1.0, None)).unwrap(),
        serde_json::from_str(&record(5.0, None)).unwrap(),
        serde_json::from_str(&record(9.0, None)).unwrap(),
    ];
    let filtered = filter_by_time(&records, 1.0, 5.0);
    assert_eq!(filtered.len(), 2);
}

#[test]
fn filter_by_time_and_package_falls_back_to_time_only_when_tag_absent() {
    let records =
        vec![serde_json::from_str(&record(2.0, None)).unwrap(), serde_json::from_str(&record(2.0, Some("com.other"))).unwrap()];
    let filtered = filter_by_time_and_package(&records, 0.0, 10.0, "com.a.b");
    assert_eq!(filtered.len(), 1);
}
