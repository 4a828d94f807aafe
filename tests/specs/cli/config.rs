//! `af config show` specs (§4.13).

use crate::support::Env;

#[test]
fn show_prints_the_default_worker_count() {
    let env = Env::new();
    let assert = env.cli().args(["config", "show"]).assert().success();
    assert!(crate::support::stdout_of(&assert).contains("worker_count:"));
}

#[test]
fn show_json_reflects_the_state_dir_override() {
    let env = Env::new();
    let assert = env.cli().args(["config", "show", "--json"]).assert().success();
    let config: serde_json::Value = serde_json::from_str(&crate::support::stdout_of(&assert)).unwrap();
    let state_dir = config["state_dir"].as_str().unwrap();
    assert!(state_dir.ends_with("state"));
}

#[test]
fn show_reflects_a_worker_count_set_in_a_config_file() {
    let env = Env::new();
    std::fs::write(env.config_path(), "worker_count = 9\n").unwrap();

    let assert = env.cli().args(["config", "show", "--json"]).assert().success();
    let config: serde_json::Value = serde_json::from_str(&crate::support::stdout_of(&assert)).unwrap();
    assert_eq!(config["worker_count"], 9);
}
