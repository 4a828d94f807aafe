// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the `af` CLI integration specs (§3.4, §4.13): spins
//! up an isolated state directory per test and wraps `assert_cmd::Command`
//! with the environment overrides needed to point the binary at it.

use assert_cmd::Command;
use std::path::{Path, PathBuf};

pub struct Env {
    dir: tempfile::TempDir,
}

impl Env {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir for af CLI spec");
        std::fs::create_dir_all(dir.path().join("state")).expect("create state dir");
        Self { dir }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A ready-to-run `af` invocation isolated to this environment's temp
    /// directory: no config file is found unless the test writes one, so
    /// every command falls back to built-in defaults plus these overrides.
    pub fn cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("af").expect("locate af binary");
        cmd.current_dir(self.dir.path());
        cmd.env("APKFARM_STATE_DIR", self.state_dir());
        cmd.env("APKFARM_LOG_DIR", self.dir.path().join("logs"));
        cmd.env_remove("APKFARM_CONFIG");
        cmd
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("apkfarm.toml")
    }
}

pub fn stdout_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).into_owned()
}
