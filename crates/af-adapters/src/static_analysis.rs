// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static analysis facade (§4.9).
//!
//! The fast stage runs in-process against the APK zip container. The deep
//! stage is a thin dispatch to an external analyzer — either a direct
//! subprocess invocation or a long-lived subprocess pool speaking a
//! one-line-JSON-in/one-line-JSON-out protocol (§6) — its internals are
//! out of scope here; only the dispatch and timeout contract live in this
//! crate.

use af_core::{Arch, StaticReport, StaticStatus, TaskId};
use parking_lot::Mutex;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;

const DEEP_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum StaticAnalysisError {
    #[error("failed to open APK: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("i/o error reading APK: {0}")]
    Io(#[from] std::io::Error),
    #[error("deep analyzer subprocess failed: {0}")]
    SubprocessFailed(String),
    #[error("deep analyzer timed out after {0:?}")]
    Timeout(Duration),
    #[error("deep analyzer response was not valid JSON: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

/// Fast, in-process APK metadata extraction. Always runs first (§4.9).
pub struct FastStageResult {
    pub arch: Arch,
    pub sha256: String,
    pub package_name: Option<String>,
    pub activity_count: u32,
    pub service_count: u32,
    pub permission_count: u32,
    pub permissions: Vec<String>,
}

fn permission_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"android\.permission\.[A-Z0-9_]+").expect("valid regex"))
}

/// The manifest root element's `package` attribute, extracted with the
/// same null-byte-stripping heuristic as the permission scan (§4.4 step 5
/// needs this to preventively uninstall any residual install before
/// installing the new APK).
fn package_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"package="([a-zA-Z0-9_.]+)""#).expect("valid regex"))
}

/// Run the fast stage against an APK on disk.
///
/// `AndroidManifest.xml` inside a real APK is binary (AXML); this extracts
/// permission strings heuristically by stripping the UTF-16LE string pool's
/// null bytes rather than fully decoding AXML, which is out of scope (the
/// deep pipeline owns faithful manifest decoding).
pub fn run_fast_stage(apk_path: impl AsRef<Path>) -> Result<FastStageResult, StaticAnalysisError> {
    let bytes = std::fs::read(apk_path.as_ref())?;
    let sha256 = format!("{:x}", Sha256::digest(&bytes));

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(&bytes))?;
    let mut lib_dirs = Vec::new();
    let mut activity_count = 0u32;
    let mut service_count = 0u32;
    let mut manifest_text = String::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if name.starts_with("lib/") {
            lib_dirs.push(name);
        }
        if name == "AndroidManifest.xml" {
            let mut raw = Vec::new();
            entry.read_to_end(&mut raw)?;
            let stripped: Vec<u8> = raw.into_iter().filter(|&b| b != 0).collect();
            manifest_text = String::from_utf8_lossy(&stripped).into_owned();
        }
    }

    let permissions: Vec<String> = {
        let mut found: Vec<String> =
            permission_pattern().find_iter(&manifest_text).map(|m| m.as_str().to_string()).collect();
        found.sort();
        found.dedup();
        found
    };
    activity_count += manifest_text.matches("Activity").count() as u32;
    service_count += manifest_text.matches("Service").count() as u32;

    let arch = Arch::from_abi_dirs(lib_dirs.iter().map(String::as_str));
    let package_name = package_name_pattern().captures(&manifest_text).map(|c| c[1].to_string());

    Ok(FastStageResult {
        arch,
        sha256,
        package_name,
        activity_count,
        service_count,
        permission_count: permissions.len() as u32,
        permissions,
    })
}

/// Evidence gathered from the APK container for the packer detector
/// (§4.8): native library names, all entry paths, and the aggregate sizes
/// of `.dex` and `lib/` entries. Reuses the same zip walk as the fast
/// stage rather than re-extracting the archive a second time.
pub struct PackerSignalsSource {
    pub native_lib_names: Vec<String>,
    pub file_paths: Vec<String>,
    pub dex_total_size: u64,
    pub native_total_size: u64,
}

pub fn scan_apk_for_packer_signals(apk_path: impl AsRef<Path>) -> Result<PackerSignalsSource, StaticAnalysisError> {
    let bytes = std::fs::read(apk_path.as_ref())?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(&bytes))?;

    let mut native_lib_names = Vec::new();
    let mut file_paths = Vec::new();
    let mut dex_total_size = 0u64;
    let mut native_total_size = 0u64;

    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let size = entry.size();
        file_paths.push(name.clone());
        if name.starts_with("lib/") {
            native_total_size += size;
            if let Some(file_name) = name.rsplit('/').next() {
                native_lib_names.push(file_name.to_string());
            }
        }
        if name.ends_with(".dex") {
            dex_total_size += size;
        }
    }

    Ok(PackerSignalsSource { native_lib_names, file_paths, dex_total_size, native_total_size })
}

/// Deep-stage dispatch mode (§4.9).
#[derive(Debug, Clone)]
pub enum DeepAnalysisDispatch {
    /// Spawn one analyzer process per request and wait for it to exit.
    Subprocess { bin_path: String },
    /// A single request/response round trip against a pre-spawned,
    /// long-lived worker process.
    Pooled,
}

/// Decide whether the deep stage should run, per configurable thresholds
/// (§4.9) or an explicit force flag.
pub fn should_run_deep_stage(
    fast: &FastStageResult,
    file_size: u64,
    force_deep: bool,
    size_threshold: u64,
    activity_threshold: u32,
    permission_threshold: u32,
) -> bool {
    force_deep
        || file_size >= size_threshold
        || fast.activity_count >= activity_threshold
        || fast.permission_count >= permission_threshold
}

/// Invoke a direct-subprocess deep analyzer: `<bin_path> <apk_path>`,
/// stdout captured as the JSON result.
pub async fn run_deep_stage_subprocess(bin_path: &str, apk_path: &str) -> Result<serde_json::Value, StaticAnalysisError> {
    let mut cmd = Command::new(bin_path);
    cmd.arg(apk_path).stdout(Stdio::piped()).stderr(Stdio::piped());
    let output = timeout(DEEP_ANALYSIS_TIMEOUT, cmd.output())
        .await
        .map_err(|_| StaticAnalysisError::Timeout(DEEP_ANALYSIS_TIMEOUT))??;
    if !output.status.success() {
        return Err(StaticAnalysisError::SubprocessFailed(String::from_utf8_lossy(&output.stderr).into_owned()));
    }
    Ok(serde_json::from_slice(&output.stdout)?)
}

/// One request/response round trip against a long-lived worker's stdio,
/// per the protocol in §6. A timeout marks the worker dead; callers must
/// discard it rather than reuse it for a subsequent task.
pub async fn run_deep_stage_pooled(worker: &mut Child, apk_path: &str) -> Result<serde_json::Value, StaticAnalysisError> {
    let stdin = worker.stdin.as_mut().expect("pooled worker stdin piped");
    let stdout = worker.stdout.as_mut().expect("pooled worker stdout piped");

    let request = serde_json::json!({ "apk_path": apk_path }).to_string();
    timeout(DEEP_ANALYSIS_TIMEOUT, async {
        stdin.write_all(request.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        Ok::<String, std::io::Error>(line)
    })
    .await
    .map_err(|_| StaticAnalysisError::Timeout(DEEP_ANALYSIS_TIMEOUT))?
    .map_err(StaticAnalysisError::Io)
    .and_then(|line| Ok(serde_json::from_str(&line)?))
}

/// A pool of long-lived deep-analysis workers (§4.9 mode (b), §3.1's
/// `static_analysis.pool` backend). Workers are spawned up front; each
/// [`DeepAnalysisPool::dispatch`] call checks one out, runs one
/// [`run_deep_stage_pooled`] round trip, and checks it back in. A worker
/// that errors or times out is discarded and replaced rather than reused,
/// per `run_deep_stage_pooled`'s own contract.
pub struct DeepAnalysisPool {
    bin_path: String,
    args: Vec<String>,
    workers: Mutex<Vec<Child>>,
}

impl DeepAnalysisPool {
    /// Spawn `worker_count` long-lived `<bin_path> --pool` workers.
    pub fn spawn(bin_path: impl Into<String>, worker_count: usize) -> std::io::Result<Self> {
        Self::spawn_with_args(bin_path, vec!["--pool".to_string()], worker_count)
    }

    /// Same as [`DeepAnalysisPool::spawn`], with explicit args in place of
    /// the default `--pool` flag. Lets tests stand in a `sh -c` script for
    /// the real deep analyzer binary.
    pub fn spawn_with_args(bin_path: impl Into<String>, args: Vec<String>, worker_count: usize) -> std::io::Result<Self> {
        let bin_path = bin_path.into();
        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            workers.push(Self::spawn_worker(&bin_path, &args)?);
        }
        Ok(Self { bin_path, args, workers: Mutex::new(workers) })
    }

    fn spawn_worker(bin_path: &str, args: &[String]) -> std::io::Result<Child> {
        Command::new(bin_path).args(args).stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped()).spawn()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    pub async fn dispatch(&self, apk_path: &str) -> Result<serde_json::Value, StaticAnalysisError> {
        let checked_out = self.workers.lock().pop();
        let mut worker = match checked_out {
            Some(worker) => worker,
            None => Self::spawn_worker(&self.bin_path, &self.args).map_err(StaticAnalysisError::Io)?,
        };

        match run_deep_stage_pooled(&mut worker, apk_path).await {
            Ok(value) => {
                self.workers.lock().push(worker);
                Ok(value)
            }
            Err(err) => {
                let _ = worker.start_kill();
                if let Ok(replacement) = Self::spawn_worker(&self.bin_path, &self.args) {
                    self.workers.lock().push(replacement);
                }
                Err(err)
            }
        }
    }
}

/// Build the persisted [`StaticReport`] for a completed fast-stage run.
pub fn report_from_fast_stage(task_id: TaskId, package_name: Option<String>, fast: &FastStageResult) -> StaticReport {
    StaticReport {
        task_id,
        status: StaticStatus::Completed,
        package_name,
        version_name: None,
        activity_count: fast.activity_count,
        service_count: fast.service_count,
        permission_count: fast.permission_count,
        permissions: fast.permissions.clone(),
        sha256: Some(fast.sha256.clone()),
        deep_analysis_ran: false,
        error: None,
    }
}

#[cfg(test)]
#[path = "static_analysis_tests.rs"]
mod tests;
