// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `afd`: the task-execution daemon (§4.14). Loads configuration, installs
//! the tracing subscriber, builds the device pool and worker pool, and
//! drains an injectable task channel until a shutdown signal arrives.

use af_adapters::{AdbDeviceClient, CliInstrumentationClient, DeepAnalysisPool, DeviceRestarter, HttpProxyGatewayClient, KubeDeviceRestarter};
use af_core::{SystemClock, Task};
use af_daemon::{shutdown, Config};
use af_engine::{CompletionCallback, DevicePool, DomainAnalysisCallback, Orchestrator, TaskRunner, WorkerPool};
use af_storage::{InProcessActivityStore, InProcessStaticReportStore, InProcessTaskStore, InProcessUnpackResultStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const TASK_CHANNEL_CAPACITY: usize = 256;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() {
    let config = Config::load();
    let _log_guard = af_daemon::logging::install(&config.logging).expect("failed to install tracing subscriber");

    tracing::info!(worker_count = config.worker_count, device_count = config.device_pool.devices.len(), "starting afd");

    let shutdown_token = CancellationToken::new();
    shutdown::spawn_signal_watcher(shutdown_token.clone());

    let device_client = Arc::new(AdbDeviceClient::new(config.adb_bin.clone(), Duration::from_secs(30)));
    let instrumentation = Arc::new(CliInstrumentationClient::new("frida"));
    let proxy_gateway = Arc::new(HttpProxyGatewayClient::new());

    let mut device_pool = DevicePool::new(device_client.clone(), SystemClock);
    match KubeDeviceRestarter::new(&config.device_pool.k8s_namespace).await {
        Ok(restarter) => device_pool = device_pool.with_restarter(Arc::new(restarter) as Arc<dyn DeviceRestarter>),
        Err(err) => tracing::warn!(%err, "no kubernetes client available, health-check failures will not trigger a container restart"),
    }
    let device_pool = Arc::new(device_pool);
    let rest_policy = config.rest_policy_default();
    device_pool.configure_rest(rest_policy.interval, rest_policy.duration);
    for descriptor in &config.device_pool.devices {
        device_pool.add(descriptor.clone());
    }

    let task_store = Arc::new(InProcessTaskStore::new());
    let activity_store = Arc::new(InProcessActivityStore::new());
    let static_report_store = Arc::new(InProcessStaticReportStore::new());
    let unpack_result_store = Arc::new(InProcessUnpackResultStore::new());

    let mut orchestrator = Orchestrator::new(
        device_pool.clone(),
        device_client,
        instrumentation,
        proxy_gateway,
        task_store.clone(),
        activity_store,
        static_report_store,
        unpack_result_store,
        SystemClock,
        shutdown_token.clone(),
        config.orchestrator_config(),
    )
    .with_domain_callback(Arc::new(CompletionCallback::new(task_store, SystemClock)) as Arc<dyn DomainAnalysisCallback>);

    if let Some(pool_config) = &config.static_analysis.pool {
        match DeepAnalysisPool::spawn(pool_config.bin_path.clone(), pool_config.worker_count) {
            Ok(pool) => orchestrator = orchestrator.with_deep_analysis_pool(Arc::new(pool)),
            Err(err) => tracing::warn!(%err, bin_path = %pool_config.bin_path, "failed to spawn deep analysis worker pool, falling back to one-shot subprocess dispatch"),
        }
    }

    let runner: Arc<dyn TaskRunner> = Arc::new(orchestrator);
    let worker_pool = WorkerPool::start(config.worker_count, TASK_CHANNEL_CAPACITY, runner);

    {
        let device_pool = device_pool.clone();
        let shutdown_token = shutdown_token.clone();
        let interval = config.device_pool.health_check_interval();
        tokio::spawn(async move { device_pool.health_check_loop(shutdown_token, interval).await });
    }

    let (task_tx, mut task_rx) = mpsc::channel::<Task>(TASK_CHANNEL_CAPACITY);
    drain_tasks(&mut task_rx, &worker_pool, shutdown_token.clone()).await;
    drop(task_tx);

    tracing::info!("shutdown signal received, draining in-flight tasks");
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, worker_pool.stop()).await;
    if drained.is_err() {
        tracing::warn!(timeout_secs = DRAIN_TIMEOUT.as_secs(), "worker pool did not drain within the shutdown timeout");
    }
    tracing::info!("afd exiting");
}

/// Forward tasks from the injectable source channel into the worker pool
/// until either the channel closes or shutdown is requested. A bounded
/// `mpsc` channel stands in for the external queue broker (§4.14);
/// production deployments replace `task_rx` with a broker-backed stream.
async fn drain_tasks(task_rx: &mut mpsc::Receiver<Task>, worker_pool: &WorkerPool, shutdown_token: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => return,
            task = task_rx.recv() => {
                match task {
                    Some(task) => {
                        if worker_pool.submit(task).await.is_err() {
                            tracing::error!("worker pool channel closed while accepting a new task");
                            return;
                        }
                    }
                    None => return,
                }
            }
        }
    }
}
