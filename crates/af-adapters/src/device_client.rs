// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed wrapper over the device control CLI (§4.1, §6).
//!
//! `DeviceClient` is a capability, not a type hierarchy: the orchestrator
//! depends on the trait, never on `AdbDeviceClient` directly, so tests can
//! substitute [`FakeDeviceClient`] without touching a real device.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum DeviceClientError {
    #[error("device control CLI exited non-zero: {0}")]
    CommandFailed(String),
    #[error("device control CLI timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to spawn device control CLI: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result of an `install` invocation: the raw stdout is kept so callers can
/// re-derive the installed package name from it if the manifest-based guess
/// was wrong (§4.4 step 6).
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub succeeded: bool,
    pub raw_output: String,
}

#[async_trait]
pub trait DeviceClient: Send + Sync + 'static {
    async fn connect(&self, target: &str) -> Result<(), DeviceClientError>;
    async fn disconnect(&self, target: &str) -> Result<(), DeviceClientError>;
    async fn devices(&self) -> Result<String, DeviceClientError>;
    async fn install(&self, target: &str, apk_path: &str) -> Result<InstallOutcome, DeviceClientError>;
    async fn uninstall(&self, target: &str, package: &str) -> Result<(), DeviceClientError>;
    /// Query the device for `expected_package` post-install (§4.4 step 6).
    /// Returns `Some(name)` only when the device actually reports that exact
    /// package as installed, `None` otherwise — the ground truth behind a
    /// `PackageMismatch` failure, since a manifest-derived guess can be wrong.
    async fn installed_package(&self, target: &str, expected_package: &str) -> Result<Option<String>, DeviceClientError>;
    async fn shell(&self, target: &str, cmd: &str) -> Result<String, DeviceClientError>;
    async fn push(&self, target: &str, src: &str, dst: &str) -> Result<(), DeviceClientError>;
    async fn pull(&self, target: &str, src: &str, dst: &str) -> Result<(), DeviceClientError>;

    /// `shell dumpsys window windows` (or equivalent) foreground-package query.
    async fn foreground_package(&self, target: &str) -> Result<Option<String>, DeviceClientError>;
    async fn screenshot(&self, target: &str, dst: &str) -> Result<(), DeviceClientError>;
    /// `shell uiautomator dump` followed by a pull of the resulting XML.
    async fn ui_dump(&self, target: &str) -> Result<String, DeviceClientError>;
}

/// Real collaborator: spawns `<cli> -s <target> <subcommand>` per invocation.
pub struct AdbDeviceClient {
    cli_path: String,
    call_timeout: Duration,
}

impl AdbDeviceClient {
    pub fn new(cli_path: impl Into<String>, call_timeout: Duration) -> Self {
        Self { cli_path: cli_path.into(), call_timeout }
    }

    async fn run(&self, args: &[&str]) -> Result<String, DeviceClientError> {
        let mut cmd = Command::new(&self.cli_path);
        cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
        let output = timeout(self.call_timeout, cmd.output())
            .await
            .map_err(|_| DeviceClientError::Timeout(self.call_timeout))??;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(DeviceClientError::CommandFailed(if stderr.is_empty() { stdout } else { stderr }));
        }
        Ok(stdout)
    }

    async fn run_for_target(&self, target: &str, args: &[&str]) -> Result<String, DeviceClientError> {
        let mut full = vec!["-s", target];
        full.extend_from_slice(args);
        self.run(&full).await
    }
}

#[async_trait]
impl DeviceClient for AdbDeviceClient {
    async fn connect(&self, target: &str) -> Result<(), DeviceClientError> {
        self.run(&["connect", target]).await.map(|_| ())
    }

    async fn disconnect(&self, target: &str) -> Result<(), DeviceClientError> {
        self.run(&["disconnect", target]).await.map(|_| ())
    }

    async fn devices(&self) -> Result<String, DeviceClientError> {
        self.run(&["devices"]).await
    }

    async fn install(&self, target: &str, apk_path: &str) -> Result<InstallOutcome, DeviceClientError> {
        let out = self.run_for_target(target, &["install", "-r", "-g", apk_path]).await?;
        Ok(InstallOutcome { succeeded: out.contains("Success"), raw_output: out })
    }

    async fn uninstall(&self, target: &str, package: &str) -> Result<(), DeviceClientError> {
        self.run_for_target(target, &["uninstall", package]).await.map(|_| ())
    }

    async fn installed_package(&self, target: &str, expected_package: &str) -> Result<Option<String>, DeviceClientError> {
        let out = self.shell(target, &format!("pm list packages {expected_package}")).await?;
        Ok(out
            .lines()
            .find_map(|line| line.trim().strip_prefix("package:"))
            .filter(|name| *name == expected_package)
            .map(str::to_string))
    }

    async fn shell(&self, target: &str, cmd: &str) -> Result<String, DeviceClientError> {
        self.run_for_target(target, &["shell", cmd]).await
    }

    async fn push(&self, target: &str, src: &str, dst: &str) -> Result<(), DeviceClientError> {
        self.run_for_target(target, &["push", src, dst]).await.map(|_| ())
    }

    async fn pull(&self, target: &str, src: &str, dst: &str) -> Result<(), DeviceClientError> {
        self.run_for_target(target, &["pull", src, dst]).await.map(|_| ())
    }

    async fn foreground_package(&self, target: &str) -> Result<Option<String>, DeviceClientError> {
        let out = self
            .run_for_target(target, &["shell", "dumpsys window windows | grep mCurrentFocus"])
            .await?;
        Ok(out.split('/').next().and_then(|head| head.rsplit(' ').next()).map(str::to_string))
    }

    async fn screenshot(&self, target: &str, dst: &str) -> Result<(), DeviceClientError> {
        self.run_for_target(target, &["shell", "screencap -p /sdcard/af_screen.png"]).await?;
        self.pull(target, "/sdcard/af_screen.png", dst).await
    }

    async fn ui_dump(&self, target: &str) -> Result<String, DeviceClientError> {
        self.run_for_target(target, &["shell", "uiautomator dump /sdcard/af_dump.xml"]).await?;
        let tmp = format!("{dst}.tmp", dst = "/tmp/af_dump.xml");
        self.pull(target, "/sdcard/af_dump.xml", &tmp).await?;
        tokio::fs::read_to_string(&tmp).await.map_err(DeviceClientError::Spawn)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct FakeState {
        calls: Vec<String>,
        installed: HashMap<String, String>,
        foreground: HashMap<String, String>,
        ui_dumps: HashMap<String, String>,
        install_should_fail: bool,
        shell_should_fail: std::collections::HashSet<String>,
    }

    /// In-memory [`DeviceClient`] for unit tests: records calls, never spawns
    /// a process.
    #[derive(Clone, Default)]
    pub struct FakeDeviceClient {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeDeviceClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<String> {
            self.inner.lock().calls.clone()
        }

        pub fn set_foreground(&self, target: &str, package: &str) {
            self.inner.lock().foreground.insert(target.to_string(), package.to_string());
        }

        pub fn set_ui_dump(&self, target: &str, xml: &str) {
            self.inner.lock().ui_dumps.insert(target.to_string(), xml.to_string());
        }

        pub fn fail_installs(&self) {
            self.inner.lock().install_should_fail = true;
        }

        /// Override the package name `installed_package`/`install` report for
        /// `target`, modeling a device whose actual post-install package
        /// differs from what the manifest heuristic guessed.
        pub fn set_installed_package(&self, target: &str, package: &str) {
            self.inner.lock().installed.insert(target.to_string(), package.to_string());
        }

        /// Make `shell` calls targeting `target` return an error, modeling an
        /// unresponsive device for liveness-probe tests.
        pub fn fail_shell(&self, target: &str) {
            self.inner.lock().shell_should_fail.insert(target.to_string());
        }
    }

    #[async_trait]
    impl DeviceClient for FakeDeviceClient {
        async fn connect(&self, target: &str) -> Result<(), DeviceClientError> {
            self.inner.lock().calls.push(format!("connect {target}"));
            Ok(())
        }

        async fn disconnect(&self, target: &str) -> Result<(), DeviceClientError> {
            self.inner.lock().calls.push(format!("disconnect {target}"));
            Ok(())
        }

        async fn devices(&self) -> Result<String, DeviceClientError> {
            Ok(String::new())
        }

        async fn install(&self, target: &str, apk_path: &str) -> Result<InstallOutcome, DeviceClientError> {
            let mut state = self.inner.lock();
            state.calls.push(format!("install {target} {apk_path}"));
            if state.install_should_fail {
                return Ok(InstallOutcome { succeeded: false, raw_output: "Failure [INSTALL_FAILED]".into() });
            }
            Ok(InstallOutcome { succeeded: true, raw_output: "Success".to_string() })
        }

        async fn uninstall(&self, target: &str, package: &str) -> Result<(), DeviceClientError> {
            self.inner.lock().calls.push(format!("uninstall {target} {package}"));
            Ok(())
        }

        async fn installed_package(&self, target: &str, expected_package: &str) -> Result<Option<String>, DeviceClientError> {
            let state = self.inner.lock();
            let actual = state.installed.get(target).cloned().unwrap_or_else(|| "com.example.app".to_string());
            Ok(if actual == expected_package { Some(actual) } else { None })
        }

        async fn shell(&self, target: &str, cmd: &str) -> Result<String, DeviceClientError> {
            let mut state = self.inner.lock();
            state.calls.push(format!("shell {target} {cmd}"));
            if state.shell_should_fail.contains(target) {
                return Err(DeviceClientError::CommandFailed("device unreachable".to_string()));
            }
            Ok(String::new())
        }

        async fn push(&self, target: &str, src: &str, dst: &str) -> Result<(), DeviceClientError> {
            self.inner.lock().calls.push(format!("push {target} {src} {dst}"));
            Ok(())
        }

        async fn pull(&self, target: &str, src: &str, dst: &str) -> Result<(), DeviceClientError> {
            self.inner.lock().calls.push(format!("pull {target} {src} {dst}"));
            Ok(())
        }

        async fn foreground_package(&self, target: &str) -> Result<Option<String>, DeviceClientError> {
            Ok(self.inner.lock().foreground.get(target).cloned())
        }

        async fn screenshot(&self, target: &str, _dst: &str) -> Result<(), DeviceClientError> {
            self.inner.lock().calls.push(format!("screenshot {target}"));
            Ok(())
        }

        async fn ui_dump(&self, target: &str) -> Result<String, DeviceClientError> {
            Ok(self.inner.lock().ui_dumps.get(target).cloned().unwrap_or_default())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeDeviceClient;

#[cfg(test)]
#[path = "device_client_tests.rs"]
mod tests;
