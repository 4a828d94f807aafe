// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

#[test]
fn retryable_kind_under_ceiling_produces_retryable_outcome() {
    let outcome = outcome_for(TaskId::new(), &PathBuf::from("/tmp/a.apk"), 1, "connection refused");
    match outcome {
        TaskOutcome::Retryable { kind, retry_count, max_retry, .. } => {
            assert_eq!(kind, FailureKind::ConnectionError);
            assert_eq!(retry_count, 1);
            assert_eq!(max_retry, 3);
        }
        other => panic!("expected Retryable, got {other:?}"),
    }
}

#[test]
fn retryable_kind_at_ceiling_produces_failed_outcome() {
    let outcome = outcome_for(TaskId::new(), &PathBuf::from("/tmp/a.apk"), 3, "connection refused");
    assert!(matches!(outcome, TaskOutcome::Failed { kind: FailureKind::ConnectionError, .. }));
}

#[test]
fn non_retryable_kind_always_fails() {
    let outcome = outcome_for(TaskId::new(), &PathBuf::from("/tmp/a.apk"), 0, "no arm device available");
    assert!(matches!(outcome, TaskOutcome::Failed { kind: FailureKind::ArmDeviceOnly, .. }));
}

#[test]
fn unclassified_error_falls_back_to_unknown_with_ceiling_one() {
    let outcome = outcome_for(TaskId::new(), &PathBuf::from("/tmp/a.apk"), 0, "something bizarre happened");
    match outcome {
        TaskOutcome::Retryable { kind, max_retry, .. } => {
            assert_eq!(kind, FailureKind::Unknown);
            assert_eq!(max_retry, 1);
        }
        other => panic!("expected Retryable, got {other:?}"),
    }
}

#[test]
fn is_retryable_matches_outcome_for_decision() {
    assert!(is_retryable(FailureKind::Timeout, 0));
    assert!(!is_retryable(FailureKind::Timeout, 3));
    assert!(!is_retryable(FailureKind::AnalysisError, 0));
}
