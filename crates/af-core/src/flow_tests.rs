// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn record(ts: f64, package: Option<&str>) -> FlowRecord {
    FlowRecord {
        timestamp: ts,
        method: "GET".into(),
        scheme: "https".into(),
        host: "example.com".into(),
        port: 443,
        path: "/".into(),
        url: "https://example.com/".into(),
        package_name: package.map(str::to_string),
        task_id: None,
    }
}

#[test]
fn in_time_range_is_inclusive_on_both_bounds() {
    let r = record(10.0, None);
    assert!(r.in_time_range(10.0, 20.0));
    assert!(r.in_time_range(5.0, 10.0));
    assert!(!r.in_time_range(10.1, 20.0));
}

#[test]
fn matches_package_with_tag_present() {
    let r = record(1.0, Some("com.a.b"));
    assert!(r.matches_package("com.a.b"));
    assert!(!r.matches_package("com.x.y"));
}

#[test]
fn matches_package_falls_back_when_untagged() {
    let r = record(1.0, None);
    assert!(r.matches_package("com.a.b"));
    assert!(r.matches_package("anything"));
}

#[test]
fn round_trips_through_json() {
    let r = record(1.5, Some("com.a.b"));
    let json = serde_json::to_string(&r).expect("serialize");
    let back: FlowRecord = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, r);
}
