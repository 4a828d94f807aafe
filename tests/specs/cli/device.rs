//! `af device add/list` specs (§4.13).

use crate::support::Env;

fn add_device(env: &Env, id: &str) -> assert_cmd::assert::Assert {
    env.cli()
        .args([
            "device",
            "add",
            id,
            "emulator-5554",
            "10.0.0.5",
            "8080",
            "mitmproxy-1",
            "8081",
            "--arch",
            "arm",
        ])
        .assert()
        .success()
}

#[test]
fn add_registers_a_device_visible_to_list() {
    let env = Env::new();
    add_device(&env, "dev-1");

    let list = env.cli().args(["device", "list", "--json"]).assert().success();
    let devices: Vec<serde_json::Value> = serde_json::from_str(&crate::support::stdout_of(&list)).unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["id"], "dev-1");
    assert_eq!(devices[0]["arch"], "arm");
}

#[test]
fn add_persists_the_device_across_separate_invocations() {
    let env = Env::new();
    add_device(&env, "dev-1");

    // A second `af` process, started fresh, must still see the device —
    // proof that `add` wrote it back to the config file on disk rather
    // than only updating in-memory state.
    let list = env.cli().args(["device", "list", "--json"]).assert().success();
    let devices: Vec<serde_json::Value> = serde_json::from_str(&crate::support::stdout_of(&list)).unwrap();
    assert_eq!(devices.len(), 1);
}

#[test]
fn add_rejects_a_duplicate_device_id() {
    let env = Env::new();
    add_device(&env, "dev-1");

    let assert = env
        .cli()
        .args(["device", "add", "dev-1", "emulator-5556", "10.0.0.6", "8080", "mitmproxy-2", "8081"])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("already registered"));
}

#[test]
fn list_on_an_empty_registry_reports_no_devices() {
    let env = Env::new();
    let assert = env.cli().args(["device", "list"]).assert().success();
    assert!(crate::support::stdout_of(&assert).contains("no devices registered"));
}
