// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task state machine (§4.4): the orchestrator that drives one APK
//! through device acquisition, install, instrumentation, packer
//! detection, the UI interaction loop, component exploration, flow
//! attribution, and always-on cleanup.

use af_adapters::attributor::{filter_by_time_and_package, parse_file};
use af_adapters::packer::{choose_merge_fallback, detect, dumped_result, failed_result, is_valid_dex, not_dumpable_result, Signals, UNPACK_TIMEOUT};
use af_adapters::static_analysis::{
    report_from_fast_stage, run_deep_stage_subprocess, run_fast_stage, scan_apk_for_packer_signals, should_run_deep_stage,
    DeepAnalysisPool, FastStageResult, StaticAnalysisError,
};
use af_adapters::{DeviceClient, DeviceClientError, InstrumentationClient, InstrumentationError, InstrumentationTarget, ProxyGatewayClient, ProxyGatewayError};
use af_core::{ActivityDetail, Clock, SystemClock, Task, TaskId, TaskOutcome, TaskStatus};
use af_storage::{ActivityStore, StaticReportStore, TaskStore, TaskStoreError, UnpackResultStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::activity_filter::filter_components;
use crate::completion_barrier::CompletionBarrier;
use crate::component_discovery::discover_activities;
use crate::device_pool::{AcquireError, DeviceDescriptor, DevicePool};
use crate::retry_policy::outcome_for;
use crate::ui_interaction::{run_exploration_phase, run_guidance_loop, Action, ActionPlanner, ExplorationConfig, GuidanceConfig, UiInteractionError};

const LAUNCH_WAIT: Duration = Duration::from_secs(3);
const UNPACK_DUMP_DIR: &str = "/sdcard/af_dump";
const BACKGROUND_MONITOR_ACTIVITY: &str = "__background_monitor__";

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("static analysis failed: {0}")]
    StaticAnalysis(#[from] StaticAnalysisError),
    #[error("device client error: {0}")]
    Device(#[from] DeviceClientError),
    #[error("instrumentation error: {0}")]
    Instrumentation(#[from] InstrumentationError),
    #[error("proxy gateway error: {0}")]
    Proxy(#[from] ProxyGatewayError),
    #[error("ui interaction error: {0}")]
    UiInteraction(#[from] UiInteractionError),
    #[error("task store error: {0}")]
    Store(#[from] TaskStoreError),
    #[error("background task join failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("device acquisition failed: {0}")]
    Acquire(AcquireError),
    #[error("install failed: {0}")]
    InstallFailed(String),
    #[error("expected package {expected} but detected {detected}: install mismatch, likely concurrent install contention")]
    PackageMismatch { expected: String, detected: String },
    #[error("no valid DEX files recovered")]
    NoDexRecovered,
    #[error("task cancelled")]
    Cancelled,
}

/// Injectable seam for the work that happens once both analysis pipelines
/// finish (§4.10): the callback owns the 95→100 COMPLETED transition,
/// which is explicitly not this orchestrator's responsibility. The no-op
/// default documents that absence is a valid configuration, not a bug.
#[async_trait]
pub trait DomainAnalysisCallback: Send + Sync + 'static {
    async fn on_both_complete(&self, task_id: TaskId);
}

pub struct NoopDomainAnalysisCallback;

#[async_trait]
impl DomainAnalysisCallback for NoopDomainAnalysisCallback {
    async fn on_both_complete(&self, _task_id: TaskId) {}
}

/// The production [`DomainAnalysisCallback`]: performs the 95→100 COMPLETED
/// transition §4.10 assigns to this callback, once both pipelines have
/// reported in. Failures are logged, not propagated — there is no caller
/// left to hand an error to once both pipelines have already finished.
pub struct CompletionCallback<C: Clock + 'static = SystemClock> {
    task_store: Arc<dyn TaskStore>,
    clock: C,
}

impl<C: Clock + 'static> CompletionCallback<C> {
    pub fn new(task_store: Arc<dyn TaskStore>, clock: C) -> Self {
        Self { task_store, clock }
    }
}

#[async_trait]
impl<C: Clock + 'static> DomainAnalysisCallback for CompletionCallback<C> {
    async fn on_both_complete(&self, task_id: TaskId) {
        if let Err(err) = self.task_store.update_status(task_id, TaskStatus::Completed, 100).await {
            tracing::error!(%task_id, %err, "failed to mark task completed after both pipelines finished");
            return;
        }
        if let Err(err) = self.task_store.set_completed_at(task_id, self.clock.epoch_ms()).await {
            tracing::error!(%task_id, %err, "failed to record completion timestamp");
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub device_wait_timeout: Duration,
    pub guidance: GuidanceConfig,
    pub exploration: ExplorationConfig,
    pub background_monitor_window: Duration,
    pub instrumentation_enabled: bool,
    pub force_deep_stage: bool,
    pub deep_stage_size_threshold: u64,
    pub deep_stage_activity_threshold: u32,
    pub deep_stage_permission_threshold: u32,
    pub deep_analysis_bin_path: Option<String>,
    pub tls_unpinning_script_path: String,
    pub dumper_script_path: String,
    pub capture_dir: PathBuf,
    pub screenshot_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            device_wait_timeout: Duration::from_secs(600),
            guidance: GuidanceConfig::default(),
            exploration: ExplorationConfig::default(),
            background_monitor_window: Duration::from_secs(30),
            instrumentation_enabled: true,
            force_deep_stage: false,
            deep_stage_size_threshold: 50_000_000,
            deep_stage_activity_threshold: 50,
            deep_stage_permission_threshold: 30,
            deep_analysis_bin_path: None,
            tls_unpinning_script_path: "/opt/apkfarm/scripts/unpin.js".to_string(),
            dumper_script_path: "/opt/apkfarm/scripts/dump_dex.js".to_string(),
            capture_dir: PathBuf::from("/var/lib/apkfarm/captures"),
            screenshot_dir: PathBuf::from("/var/lib/apkfarm/screenshots"),
            log_dir: PathBuf::from("/var/lib/apkfarm/logs"),
        }
    }
}

/// Per-run mutable bookkeeping threaded through the always-on cleanup
/// (§4.4 step 16), since the package name and proxy-redirect state are
/// only known partway through the control flow but cleanup must act on
/// whatever was learned before an early exit.
#[derive(Default)]
struct RunState {
    package_name: Option<String>,
    proxy_redirected: bool,
    instrumentation_target: Option<InstrumentationTarget>,
}

pub struct Orchestrator<C: Clock + 'static = SystemClock> {
    device_pool: Arc<DevicePool<C>>,
    device_client: Arc<dyn DeviceClient>,
    instrumentation: Arc<dyn InstrumentationClient>,
    proxy_gateway: Arc<dyn ProxyGatewayClient>,
    task_store: Arc<dyn TaskStore>,
    activity_store: Arc<dyn ActivityStore>,
    static_report_store: Arc<dyn StaticReportStore>,
    unpack_result_store: Arc<dyn UnpackResultStore>,
    domain_callback: Arc<dyn DomainAnalysisCallback>,
    planner: Option<Arc<dyn ActionPlanner>>,
    deep_analysis_pool: Option<Arc<DeepAnalysisPool>>,
    clock: C,
    shutdown: CancellationToken,
    config: OrchestratorConfig,
    barriers: Arc<parking_lot::Mutex<HashMap<TaskId, CompletionBarrier>>>,
}

#[allow(clippy::too_many_arguments)]
impl<C: Clock + 'static> Orchestrator<C> {
    pub fn new(
        device_pool: Arc<DevicePool<C>>,
        device_client: Arc<dyn DeviceClient>,
        instrumentation: Arc<dyn InstrumentationClient>,
        proxy_gateway: Arc<dyn ProxyGatewayClient>,
        task_store: Arc<dyn TaskStore>,
        activity_store: Arc<dyn ActivityStore>,
        static_report_store: Arc<dyn StaticReportStore>,
        unpack_result_store: Arc<dyn UnpackResultStore>,
        clock: C,
        shutdown: CancellationToken,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            device_pool,
            device_client,
            instrumentation,
            proxy_gateway,
            task_store,
            activity_store,
            static_report_store,
            unpack_result_store,
            domain_callback: Arc::new(NoopDomainAnalysisCallback),
            planner: None,
            deep_analysis_pool: None,
            clock,
            shutdown,
            config,
            barriers: Arc::new(parking_lot::Mutex::new(HashMap::new())),
        }
    }

    pub fn with_domain_callback(mut self, callback: Arc<dyn DomainAnalysisCallback>) -> Self {
        self.domain_callback = callback;
        self
    }

    pub fn with_planner(mut self, planner: Arc<dyn ActionPlanner>) -> Self {
        self.planner = Some(planner);
        self
    }

    /// Dispatch the deep stage through a long-lived worker pool instead of
    /// one-shot subprocesses (§3.1's `static_analysis.pool` backend, §4.9
    /// mode (b)). Takes priority over `deep_analysis_bin_path` when set.
    pub fn with_deep_analysis_pool(mut self, pool: Arc<DeepAnalysisPool>) -> Self {
        self.deep_analysis_pool = Some(pool);
        self
    }

    fn barrier_for(&self, task_id: TaskId) -> CompletionBarrier {
        self.barriers.lock().entry(task_id).or_insert_with(CompletionBarrier::new).clone()
    }

    /// Best-effort translation of a planned [`Action`] into a device-client
    /// shell invocation. Failures are logged, not propagated: both the
    /// guidance loop and the exploration phase treat every action as
    /// fire-and-forget (§4.7).
    async fn apply_action(&self, adb_target: &str, action: Action) {
        let result = match &action {
            Action::Tap { x, y } => self.device_client.shell(adb_target, &format!("input tap {x} {y}")).await,
            Action::Swipe { x1, y1, x2, y2 } => {
                self.device_client.shell(adb_target, &format!("input swipe {x1} {y1} {x2} {y2} 300")).await
            }
            Action::PressBack => self.device_client.shell(adb_target, "input keyevent KEYCODE_BACK").await,
            Action::PressHome => self.device_client.shell(adb_target, "input keyevent KEYCODE_HOME").await,
            Action::Wait => return,
        };
        if let Err(err) = result {
            tracing::debug!(%err, ?action, adb_target, "ui action failed");
        }
    }

    fn instrumentation_target(descriptor: &DeviceDescriptor) -> InstrumentationTarget {
        match &descriptor.instrumentation_host {
            Some(host_port) => {
                let (host, port) = host_port.split_once(':').unwrap_or((host_port.as_str(), "27042"));
                InstrumentationTarget::Network { host: host.to_string(), port: port.parse().unwrap_or(27042) }
            }
            None => InstrumentationTarget::Usb,
        }
    }

    /// §4.4 step 7: run the static facade to completion on a detached task
    /// and fire the per-task completion barrier on success. Deep-stage
    /// failure is logged and never fails the task (§7 "recoverable at
    /// stage boundary"); fast-stage output is kept regardless.
    fn spawn_static_analysis(&self, task_id: TaskId, apk_path: PathBuf, fast: FastStageResult, package_name: String) {
        let report_store = self.static_report_store.clone();
        let task_store = self.task_store.clone();
        let barrier = self.barrier_for(task_id);
        let barriers = self.barriers.clone();
        let domain_callback = self.domain_callback.clone();
        let config = self.config.clone();
        let deep_analysis_pool = self.deep_analysis_pool.clone();

        tokio::spawn(async move {
            let file_size = tokio::fs::metadata(&apk_path).await.map(|m| m.len()).unwrap_or(0);
            let mut report = report_from_fast_stage(task_id, Some(package_name), &fast);

            let deep_needed = should_run_deep_stage(
                &fast,
                file_size,
                config.force_deep_stage,
                config.deep_stage_size_threshold,
                config.deep_stage_activity_threshold,
                config.deep_stage_permission_threshold,
            );
            if deep_needed {
                let apk_path_str = apk_path.to_string_lossy();
                let dispatched = if let Some(pool) = &deep_analysis_pool {
                    Some(pool.dispatch(&apk_path_str).await)
                } else if let Some(bin_path) = &config.deep_analysis_bin_path {
                    Some(run_deep_stage_subprocess(bin_path, &apk_path_str).await)
                } else {
                    None
                };
                match dispatched {
                    Some(Ok(_)) => report.deep_analysis_ran = true,
                    Some(Err(err)) => tracing::warn!(%task_id, %err, "deep static analysis failed, keeping fast-stage report"),
                    None => {}
                }
            }

            report_store.upsert(report).await;
            if let Err(err) = task_store.mark_static_completed(task_id).await {
                tracing::error!(%task_id, %err, "failed to persist static analysis completion");
                return;
            }
            let fired = barrier.mark_static_completed(move || async move {
                domain_callback.on_both_complete(task_id).await;
            });
            if fired {
                barriers.lock().remove(&task_id);
            }
        });
    }

    /// §4.8: detect a packer from the APK's container contents and, if the
    /// matched rule is dumpable, run the dynamic unpacker. Always persists
    /// an [`af_core::UnpackResult`] row; never returns an error to the
    /// caller, since unpacking failure must not fail the owning task.
    async fn run_packer_stage(&self, task_id: TaskId, apk_path: &std::path::Path, target: &InstrumentationTarget, adb_target: &str, package: &str) {
        let apk_path_owned = apk_path.to_path_buf();
        let source = match tokio::task::spawn_blocking(move || scan_apk_for_packer_signals(&apk_path_owned)).await {
            Ok(Ok(source)) => source,
            Ok(Err(err)) => {
                self.unpack_result_store.upsert(failed_result(task_id, err.to_string())).await;
                return;
            }
            Err(err) => {
                self.unpack_result_store.upsert(failed_result(task_id, err.to_string())).await;
                return;
            }
        };

        let signals = Signals {
            native_lib_names: &source.native_lib_names,
            file_paths: &source.file_paths,
            dex_total_size: source.dex_total_size,
            native_total_size: source.native_total_size,
        };
        let outcome = detect(&signals);
        let Some(matched_rule) = outcome.matched_rule else {
            self.unpack_result_store.upsert(not_dumpable_result(task_id)).await;
            return;
        };
        if !outcome.dumpable {
            self.unpack_result_store.upsert(not_dumpable_result(task_id)).await;
            return;
        }

        match self.dump_packed_dex(task_id, target, adb_target, package).await {
            Ok((paths, merged)) => {
                self.unpack_result_store.upsert(dumped_result(task_id, matched_rule, outcome.confidence, paths, merged)).await;
            }
            Err(err) => {
                self.unpack_result_store.upsert(failed_result(task_id, err.to_string())).await;
            }
        }
    }

    async fn dump_packed_dex(
        &self,
        task_id: TaskId,
        target: &InstrumentationTarget,
        adb_target: &str,
        package: &str,
    ) -> Result<(Vec<String>, Option<String>), OrchestratorError> {
        self.instrumentation.inject_script(target, package, &self.config.dumper_script_path).await?;
        tokio::time::sleep(UNPACK_TIMEOUT).await;

        let listing = self.device_client.shell(adb_target, &format!("ls {UNPACK_DUMP_DIR}")).await?;
        let mut valid_paths = Vec::new();
        for name in listing.split_whitespace() {
            let remote = format!("{UNPACK_DUMP_DIR}/{name}");
            let local = format!("/tmp/af-unpack-{task_id}-{name}");
            if self.device_client.pull(adb_target, &remote, &local).await.is_err() {
                continue;
            }
            if let Ok(bytes) = tokio::fs::read(&local).await {
                if is_valid_dex(&bytes) {
                    valid_paths.push(local);
                }
            }
        }

        if valid_paths.is_empty() {
            return Err(OrchestratorError::NoDexRecovered);
        }
        let merged = if valid_paths.len() > 1 { choose_merge_fallback(&valid_paths) } else { None };
        Ok((valid_paths, merged))
    }

    /// §4.4 step 13's attribution half: read the task's capture file and
    /// count flows landing in `[start, end]` for `package_name`. A missing
    /// or unreadable capture file attributes zero flows rather than
    /// failing the task.
    async fn attribute_flows(&self, task_id: TaskId, package_name: &str, start: f64, end: f64) -> usize {
        let path = self.config.capture_dir.join(format!("{task_id}.jsonl"));
        let records = tokio::task::spawn_blocking(move || parse_file(path)).await.ok().and_then(Result::ok).unwrap_or_default();
        filter_by_time_and_package(&records, start, end, package_name).len()
    }

    async fn collect_logs(&self, task_id: TaskId, adb_target: &str) {
        match self.device_client.shell(adb_target, "logcat -d -t 2000").await {
            Ok(logs) => {
                let path = self.config.log_dir.join(format!("{task_id}.log"));
                if let Err(err) = tokio::fs::write(&path, logs).await {
                    tracing::warn!(%task_id, %err, "failed to persist collected logcat output");
                }
            }
            Err(err) => tracing::warn!(%task_id, %err, "logcat collection failed"),
        }
    }

    /// Always-on cleanup (§4.4 step 16): runs regardless of how far
    /// `drive_with_device` got. Acts only on whatever `state` managed to
    /// learn before any early exit.
    async fn cleanup(&self, state: &RunState, descriptor: &DeviceDescriptor, adb_target: &str) {
        if let (Some(target), Some(package)) = (&state.instrumentation_target, &state.package_name) {
            let _ = self.instrumentation.stop(target, package).await;
        }
        if let Some(package) = &state.package_name {
            let _ = self.device_client.shell(adb_target, &format!("am force-stop {package}")).await;
            let _ = self.device_client.uninstall(adb_target, package).await;
        }
        if state.proxy_redirected {
            let _ = self.proxy_gateway.clear_output(&descriptor.proxy_host, descriptor.proxy_api_port).await;
        }
    }

    async fn drive(&self, task: &Task) -> Result<(), OrchestratorError> {
        let task_id = task.task_id;

        // Step 1: architecture detection, in-process.
        let apk_path = task.apk_path.clone();
        let fast = tokio::task::spawn_blocking(move || run_fast_stage(apk_path)).await.map_err(OrchestratorError::Join)??;

        // Step 2: acquire a matching device.
        self.task_store.update_status(task_id, TaskStatus::Installing, 10).await?;
        self.task_store.update_current_step(task_id, "acquiring_device".to_string()).await?;
        let acquired = match self.device_pool.acquire(&self.shutdown, task_id, fast.arch, self.config.device_wait_timeout).await {
            Ok(acquired) => acquired,
            Err(AcquireError::Cancelled) => return Err(OrchestratorError::Cancelled),
            Err(err) => return Err(OrchestratorError::Acquire(err)),
        };

        // Step 3: bind the device-scoped identifiers for the rest of the run.
        let descriptor = acquired.descriptor().clone();
        let adb_target = descriptor.adb_target.clone();

        let mut state = RunState::default();
        let result = self.drive_with_device(task, &descriptor, &adb_target, fast, &mut state).await;

        // Step 16: always-on cleanup, regardless of where the run stopped.
        self.cleanup(&state, &descriptor, &adb_target).await;
        self.device_pool.release(&self.device_pool, acquired);

        result
    }

    #[allow(clippy::too_many_lines)]
    async fn drive_with_device(
        &self,
        task: &Task,
        descriptor: &DeviceDescriptor,
        adb_target: &str,
        fast: FastStageResult,
        state: &mut RunState,
    ) -> Result<(), OrchestratorError> {
        let task_id = task.task_id;

        // Step 4: redirect this device's proxy output to the task's capture file.
        self.proxy_gateway.set_output(&descriptor.proxy_host, descriptor.proxy_api_port, &task_id.to_string()).await?;
        state.proxy_redirected = true;

        // Step 5: preventively uninstall any residual install of the expected package.
        if let Some(expected) = &fast.package_name {
            let _ = self.device_client.uninstall(adb_target, expected).await;
        }

        // Step 6: install and detect the installed package, failing on mismatch.
        self.task_store.update_status(task_id, TaskStatus::Installing, 20).await?;
        let install = self.device_client.install(adb_target, &task.apk_path.to_string_lossy()).await?;
        if !install.succeeded {
            return Err(OrchestratorError::InstallFailed(install.raw_output));
        }
        let package_name = match &fast.package_name {
            Some(expected) => match self.device_client.installed_package(adb_target, expected).await? {
                Some(detected) => detected,
                None => {
                    return Err(OrchestratorError::PackageMismatch {
                        expected: expected.clone(),
                        detected: "not found on device".to_string(),
                    })
                }
            },
            None => "unknown".to_string(),
        };
        state.package_name = Some(package_name.clone());
        self.task_store.set_package_name(task_id, package_name.clone()).await?;
        self.task_store.update_status(task_id, TaskStatus::Installing, 30).await?;

        // Step 7: static analysis runs detached from here on.
        self.spawn_static_analysis(task_id, task.apk_path.clone(), fast, package_name.clone());

        let target = Self::instrumentation_target(descriptor);

        // Step 8: instrumentation agent.
        if self.config.instrumentation_enabled {
            self.instrumentation.start(&target, &package_name).await?;
            state.instrumentation_target = Some(target.clone());
            self.instrumentation.inject_script(&target, &package_name, &self.config.tls_unpinning_script_path).await?;
        }

        // Step 9: packer detection and dynamic unpacking.
        self.run_packer_stage(task_id, &task.apk_path, &target, adb_target, &package_name).await;

        // Step 10: launch the app and verify it reached the foreground.
        self.task_store.update_status(task_id, TaskStatus::Running, 35).await?;
        self.launch_and_verify_foreground(adb_target, &package_name).await?;

        // Step 11: guidance loop dismisses launch-time onboarding.
        let planner = self.planner.as_deref();
        run_guidance_loop(self.device_client.as_ref(), &package_name, adb_target, self.config.guidance, |action| {
            self.apply_action(adb_target, action)
        })
        .await?;
        self.task_store.update_status(task_id, TaskStatus::Running, 50).await?;

        // Step 12: enumerate and filter the package's activity components.
        let dump = self.device_client.shell(adb_target, &format!("dumpsys package {package_name}")).await?;
        let fqns = discover_activities(&dump, &package_name);
        let filter_outcome = filter_components(&fqns);

        // Step 13: explore each selected component and attribute its flows.
        let selected_count = filter_outcome.selected.len().max(1);
        for (idx, activity) in filter_outcome.selected.iter().enumerate() {
            if self.task_store.get(task_id).await.map(|t| t.should_stop).unwrap_or(false) {
                return Err(OrchestratorError::Cancelled);
            }

            let screenshot_dst = self.config.screenshot_dir.join(format!("{task_id}-{idx}.png"));
            let record = run_exploration_phase(
                self.device_client.as_ref(),
                &self.clock,
                &package_name,
                adb_target,
                activity,
                &screenshot_dst.to_string_lossy(),
                &self.config.exploration,
                planner,
                |action| self.apply_action(adb_target, action),
            )
            .await?;

            let flow_count = self.attribute_flows(task_id, &package_name, record.start_time, record.end_time).await;
            self.activity_store
                .record(ActivityDetail {
                    task_id,
                    activity: activity.clone(),
                    is_core: filter_outcome.core_activities.contains(activity),
                    launch_failed: record.launch_failed,
                    start_time: record.start_time,
                    end_time: record.end_time,
                    flow_count,
                })
                .await;

            let progress = 50 + (idx as u32 + 1) * 35 / selected_count as u32;
            self.task_store.update_status(task_id, TaskStatus::Running, progress.min(85) as u8).await?;
        }

        // Step 14: background-monitor the app for delayed/periodic requests.
        self.task_store.update_status(task_id, TaskStatus::Running, 90).await?;
        let bg_start = self.clock.epoch_ms() as f64 / 1000.0;
        tokio::time::sleep(self.config.background_monitor_window).await;
        let bg_end = self.clock.epoch_ms() as f64 / 1000.0;
        let bg_flow_count = self.attribute_flows(task_id, &package_name, bg_start, bg_end).await;
        self.activity_store
            .record(ActivityDetail {
                task_id,
                activity: BACKGROUND_MONITOR_ACTIVITY.to_string(),
                is_core: false,
                launch_failed: false,
                start_time: bg_start,
                end_time: bg_end,
                flow_count: bg_flow_count,
            })
            .await;

        // Step 15: collect post-mortem logs.
        self.task_store.update_status(task_id, TaskStatus::Collecting, 92).await?;
        self.collect_logs(task_id, adb_target).await;

        // Dynamic analysis is done; the completion barrier's callback owns
        // the 95 → 100 COMPLETED transition (§4.10).
        self.task_store.update_status(task_id, TaskStatus::Collecting, 95).await?;
        self.task_store.mark_dynamic_completed(task_id).await?;
        let barrier = self.barrier_for(task_id);
        let barriers = self.barriers.clone();
        let domain_callback = self.domain_callback.clone();
        let fired = barrier.mark_dynamic_completed(move || async move {
            domain_callback.on_both_complete(task_id).await;
        });
        if fired {
            barriers.lock().remove(&task_id);
        }

        Ok(())
    }

    async fn launch_and_verify_foreground(&self, adb_target: &str, package_name: &str) -> Result<(), OrchestratorError> {
        self.device_client.shell(adb_target, &format!("monkey -p {package_name} -c android.intent.category.LAUNCHER 1")).await?;
        tokio::time::sleep(LAUNCH_WAIT).await;

        if self.device_client.foreground_package(adb_target).await?.as_deref() != Some(package_name) {
            self.device_client.shell(adb_target, &format!("monkey -p {package_name} -c android.intent.category.LAUNCHER 1")).await?;
            tokio::time::sleep(LAUNCH_WAIT).await;
        }
        Ok(())
    }
}

impl<C: Clock + 'static> Orchestrator<C> {
    async fn run_traced(&self, task: Task) -> Result<(), TaskOutcome> {
        let task_id = task.task_id;
        let apk_path = task.apk_path.clone();
        let retry_count = task.retry_count;

        match self.drive(&task).await {
            Ok(()) => Ok(()),
            Err(OrchestratorError::Cancelled) => {
                let _ = self.task_store.update_status(task_id, TaskStatus::Canceled, task.progress_percent).await;
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                let outcome = outcome_for(task_id, &apk_path, retry_count, message.clone());
                match &outcome {
                    TaskOutcome::Retryable { kind, .. } => {
                        let _ = self.task_store.mark_retryable(task_id, *kind, message).await;
                    }
                    TaskOutcome::Failed { kind, .. } => {
                        let _ = self.task_store.mark_failed(task_id, *kind, message).await;
                    }
                }
                Err(outcome)
            }
        }
    }
}

#[async_trait]
impl<C: Clock + 'static> crate::worker_pool::TaskRunner for Orchestrator<C> {
    async fn run(&self, task: Task) -> Result<(), TaskOutcome> {
        let span = tracing::info_span!("task", task_id = %task.task_id);
        self.run_traced(task).instrument(span).await
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
