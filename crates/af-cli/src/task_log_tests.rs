// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use af_core::Task;

fn config_in(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.state_dir = dir.to_path_buf();
    config
}

#[test]
fn append_then_read_all_recovers_the_task() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let task = Task::new("/tmp/app.apk");

    append(&config, &task).unwrap();

    let tasks = read_all(&config);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task_id, task.task_id);
}

#[test]
fn later_append_for_the_same_task_id_overwrites_the_earlier_record() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let mut task = Task::new("/tmp/app.apk");

    append(&config, &task).unwrap();
    task.progress_percent = 50;
    append(&config, &task).unwrap();

    let tasks = read_all(&config);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].progress_percent, 50);
}

#[test]
fn find_returns_none_for_an_unknown_task_id() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    assert!(find(&config, TaskId::new()).is_none());
}

#[test]
fn read_all_on_a_missing_log_file_is_an_empty_list() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    assert!(read_all(&config).is_empty());
}
