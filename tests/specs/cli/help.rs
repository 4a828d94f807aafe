//! `af --help` and subcommand help output specs (§4.13).

use crate::support::Env;

#[test]
fn af_no_subcommand_fails_with_usage() {
    let env = Env::new();
    let assert = env.cli().assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("Usage:"));
}

#[test]
fn af_help_shows_usage() {
    let env = Env::new();
    let assert = env.cli().arg("--help").assert().success();
    assert!(crate::support::stdout_of(&assert).contains("Usage:"));
}

#[test]
fn af_task_help_shows_subcommands() {
    let env = Env::new();
    let assert = env.cli().args(["task", "--help"]).assert().success();
    let stdout = crate::support::stdout_of(&assert);
    assert!(stdout.contains("submit"));
    assert!(stdout.contains("status"));
    assert!(stdout.contains("list"));
}

#[test]
fn af_device_help_shows_subcommands() {
    let env = Env::new();
    let assert = env.cli().args(["device", "--help"]).assert().success();
    let stdout = crate::support::stdout_of(&assert);
    assert!(stdout.contains("add"));
    assert!(stdout.contains("list"));
}

#[test]
fn af_config_help_shows_show_subcommand() {
    let env = Env::new();
    let assert = env.cli().args(["config", "--help"]).assert().success();
    assert!(crate::support::stdout_of(&assert).contains("show"));
}

#[test]
fn af_version_shows_the_crate_version() {
    let env = Env::new();
    let assert = env.cli().arg("--version").assert().success();
    assert!(crate::support::stdout_of(&assert).contains(env!("CARGO_PKG_VERSION")));
}
