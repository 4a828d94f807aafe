// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instrumentation agent client (§4.4 step 8, §6).
//!
//! Pushes/starts the on-device agent and injects a TLS-pinning-bypass
//! script. Connection target is either USB (`-U`) or a network host/port
//! pair (`-H host:port`).

use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum InstrumentationError {
    #[error("instrumentation CLI exited non-zero: {0}")]
    CommandFailed(String),
    #[error("failed to spawn instrumentation CLI: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Network location of the instrumentation agent, or USB.
#[derive(Debug, Clone)]
pub enum InstrumentationTarget {
    Usb,
    Network { host: String, port: u16 },
}

#[async_trait]
pub trait InstrumentationClient: Send + Sync + 'static {
    async fn start(&self, target: &InstrumentationTarget, package: &str) -> Result<(), InstrumentationError>;
    async fn inject_script(
        &self,
        target: &InstrumentationTarget,
        package: &str,
        script_path: &str,
    ) -> Result<(), InstrumentationError>;
    /// Detach the agent from `package` (§4.4 step 16's "stop the agent").
    /// Distinct from force-stopping the app process itself: the agent can
    /// outlive the app (it watches for respawns) until explicitly killed.
    async fn stop(&self, target: &InstrumentationTarget, package: &str) -> Result<(), InstrumentationError>;
}

pub struct CliInstrumentationClient {
    cli_path: String,
    kill_cli_path: String,
}

impl CliInstrumentationClient {
    pub fn new(cli_path: impl Into<String>) -> Self {
        let cli_path = cli_path.into();
        let kill_cli_path = format!("{cli_path}-kill");
        Self { cli_path, kill_cli_path }
    }

    fn target_args(target: &InstrumentationTarget) -> Vec<String> {
        match target {
            InstrumentationTarget::Usb => vec!["-U".to_string()],
            InstrumentationTarget::Network { host, port } => vec!["-H".to_string(), format!("{host}:{port}")],
        }
    }

    async fn run(&self, args: &[String]) -> Result<(), InstrumentationError> {
        Self::run_cli(&self.cli_path, args).await
    }

    async fn run_kill(&self, args: &[String]) -> Result<(), InstrumentationError> {
        Self::run_cli(&self.kill_cli_path, args).await
    }

    async fn run_cli(cli_path: &str, args: &[String]) -> Result<(), InstrumentationError> {
        let mut cmd = Command::new(cli_path);
        cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(InstrumentationError::CommandFailed(String::from_utf8_lossy(&output.stderr).into_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl InstrumentationClient for CliInstrumentationClient {
    async fn start(&self, target: &InstrumentationTarget, package: &str) -> Result<(), InstrumentationError> {
        let mut args = Self::target_args(target);
        args.push("-f".to_string());
        args.push(package.to_string());
        args.push("--no-pause".to_string());
        self.run(&args).await
    }

    async fn inject_script(
        &self,
        target: &InstrumentationTarget,
        package: &str,
        script_path: &str,
    ) -> Result<(), InstrumentationError> {
        let mut args = Self::target_args(target);
        args.push("-f".to_string());
        args.push(package.to_string());
        args.push("-l".to_string());
        args.push(script_path.to_string());
        args.push("--no-pause".to_string());
        self.run(&args).await
    }

    async fn stop(&self, target: &InstrumentationTarget, package: &str) -> Result<(), InstrumentationError> {
        let mut args = Self::target_args(target);
        args.push(package.to_string());
        self.run_kill(&args).await
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    pub struct FakeInstrumentationClient {
        calls: Arc<Mutex<Vec<String>>>,
        fail: Arc<Mutex<bool>>,
    }

    impl FakeInstrumentationClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        pub fn fail_next(&self) {
            *self.fail.lock() = true;
        }
    }

    #[async_trait]
    impl InstrumentationClient for FakeInstrumentationClient {
        async fn start(&self, _target: &InstrumentationTarget, package: &str) -> Result<(), InstrumentationError> {
            self.calls.lock().push(format!("start {package}"));
            if *self.fail.lock() {
                return Err(InstrumentationError::CommandFailed("frida-server not reachable".into()));
            }
            Ok(())
        }

        async fn inject_script(
            &self,
            _target: &InstrumentationTarget,
            package: &str,
            script_path: &str,
        ) -> Result<(), InstrumentationError> {
            self.calls.lock().push(format!("inject {package} {script_path}"));
            Ok(())
        }

        async fn stop(&self, _target: &InstrumentationTarget, package: &str) -> Result<(), InstrumentationError> {
            self.calls.lock().push(format!("stop {package}"));
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeInstrumentationClient;

#[cfg(test)]
#[path = "instrumentation_tests.rs"]
mod tests;
