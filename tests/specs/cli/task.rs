//! `af task submit/status/list` specs (§4.13).

use crate::support::Env;

fn write_fixture_apk(env: &Env) -> std::path::PathBuf {
    let path = env.path().join("fixture.apk");
    std::fs::write(&path, b"not a real zip, just a placeholder payload").unwrap();
    path
}

#[test]
fn submit_rejects_a_missing_apk_path() {
    let env = Env::new();
    let assert = env.cli().args(["task", "submit", "/nonexistent/app.apk"]).assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("not found"));
}

#[test]
fn submit_then_status_recovers_the_queued_task() {
    let env = Env::new();
    let apk = write_fixture_apk(&env);

    let submit = env.cli().args(["task", "submit", apk.to_str().unwrap(), "--json"]).assert().success();
    let stdout = crate::support::stdout_of(&submit);
    let submitted: serde_json::Value = serde_json::from_str(&stdout).expect("submit --json prints a Task");
    let task_id = submitted["task_id"].as_str().expect("task_id field").to_string();
    assert_eq!(submitted["status"], "queued");

    let status = env.cli().args(["task", "status", &task_id, "--json"]).assert().success();
    let fetched: serde_json::Value = serde_json::from_str(&crate::support::stdout_of(&status)).unwrap();
    assert_eq!(fetched["task_id"], task_id);
}

#[test]
fn status_for_an_unknown_task_id_fails() {
    let env = Env::new();
    let assert = env.cli().args(["task", "status", "tsk-doesnotexist"]).assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("not found"));
}

#[test]
fn list_reflects_every_submitted_task() {
    let env = Env::new();
    let apk_a = write_fixture_apk(&env);
    let apk_b = env.path().join("fixture2.apk");
    std::fs::write(&apk_b, b"second fixture").unwrap();

    env.cli().args(["task", "submit", apk_a.to_str().unwrap()]).assert().success();
    env.cli().args(["task", "submit", apk_b.to_str().unwrap()]).assert().success();

    let list = env.cli().args(["task", "list", "--json"]).assert().success();
    let tasks: Vec<serde_json::Value> = serde_json::from_str(&crate::support::stdout_of(&list)).unwrap();
    assert_eq!(tasks.len(), 2);
}

#[test]
fn list_with_status_filter_excludes_non_matching_tasks() {
    let env = Env::new();
    let apk = write_fixture_apk(&env);
    env.cli().args(["task", "submit", apk.to_str().unwrap()]).assert().success();

    let list = env.cli().args(["task", "list", "--status", "completed", "--json"]).assert().success();
    let tasks: Vec<serde_json::Value> = serde_json::from_str(&crate::support::stdout_of(&list)).unwrap();
    assert!(tasks.is_empty());
}
