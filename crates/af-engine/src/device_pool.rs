// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device pool: bounded set of device descriptors, exclusive acquisition,
//! rest windows, and health checking (§4.1).

use af_adapters::{DeviceClient, DeviceRestarter};
use af_core::{Arch, Clock, SystemClock, TaskId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const ACQUIRE_POLL_INTERVAL: Duration = Duration::from_millis(500);
const LIVENESS_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Static identity of a registered device (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub adb_target: String,
    pub proxy_host: String,
    pub proxy_port: u16,
    pub proxy_container: String,
    pub proxy_api_port: u16,
    pub instrumentation_host: Option<String>,
    pub arch: Arch,
}

/// Mutable per-device state, guarded by the slot's own mutex (§3, §5).
#[derive(Debug, Default)]
struct DeviceState {
    in_use: bool,
    current_task_id: Option<TaskId>,
    tasks_completed: u32,
    is_resting: bool,
    last_rest_time_ms: Option<u64>,
    healthy: bool,
}

struct DeviceSlot {
    descriptor: DeviceDescriptor,
    state: Mutex<DeviceState>,
}

/// An exclusively-held device, returned by [`DevicePool::acquire`]. Callers
/// must pass this back to [`DevicePool::release`] when the task finishes —
/// there is no implicit release on drop, matching §9's "one-way reference"
/// design (the device never reaches back into the orchestrator).
pub struct AcquiredDevice {
    slot: Arc<DeviceSlot>,
    pub task_id: TaskId,
}

impl AcquiredDevice {
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.slot.descriptor
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AcquireError {
    #[error("no device registered for architecture {0}")]
    NoDeviceOfArch(Arch),
    #[error("all matching devices are busy")]
    AllBusy,
    #[error("matching devices are unhealthy")]
    Unhealthy,
    #[error("acquisition was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct RestPolicy {
    pub interval: u32,
    pub duration: Duration,
}

impl Default for RestPolicy {
    fn default() -> Self {
        Self { interval: 50, duration: Duration::from_secs(300) }
    }
}

pub struct DevicePool<C: Clock = SystemClock> {
    slots: Mutex<Vec<Arc<DeviceSlot>>>,
    rest_policy: Mutex<RestPolicy>,
    client: Arc<dyn DeviceClient>,
    restarter: Option<Arc<dyn DeviceRestarter>>,
    clock: C,
}

impl<C: Clock> DevicePool<C> {
    pub fn new(client: Arc<dyn DeviceClient>, clock: C) -> Self {
        Self { slots: Mutex::new(Vec::new()), rest_policy: Mutex::new(RestPolicy::default()), client, restarter: None, clock }
    }

    pub fn with_restarter(mut self, restarter: Arc<dyn DeviceRestarter>) -> Self {
        self.restarter = Some(restarter);
        self
    }

    pub fn add(&self, descriptor: DeviceDescriptor) {
        let slot = Arc::new(DeviceSlot {
            descriptor,
            state: Mutex::new(DeviceState { healthy: true, ..Default::default() }),
        });
        self.slots.lock().push(slot);
    }

    pub fn configure_rest(&self, interval: u32, duration: Duration) {
        *self.rest_policy.lock() = RestPolicy { interval, duration };
    }

    pub fn device_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Try once to find and claim a matching, healthy, non-resting device.
    /// Returns `None` (not an error) when nothing currently qualifies —
    /// callers distinguish "no device exists" from "none available right
    /// now" only once the poll loop as a whole gives up.
    async fn try_select(&self, task_id: TaskId, required_arch: Arch) -> Option<AcquiredDevice> {
        let candidates: Vec<Arc<DeviceSlot>> = {
            let slots = self.slots.lock();
            slots.iter().filter(|s| required_arch.accepts(s.descriptor.arch)).cloned().collect()
        };

        // Two-pass scan for ANY: ARM preferred, X86 fallback (§4.1).
        let passes: Vec<Arch> = if required_arch == Arch::Any { vec![Arch::Arm, Arch::X86] } else { vec![required_arch] };

        for pass_arch in passes {
            for slot in &candidates {
                if slot.descriptor.arch != pass_arch && required_arch == Arch::Any {
                    continue;
                }
                if let Some(acquired) = self.try_claim(slot, task_id).await {
                    return Some(acquired);
                }
            }
        }
        None
    }

    async fn try_claim(&self, slot: &Arc<DeviceSlot>, task_id: TaskId) -> Option<AcquiredDevice> {
        {
            let mut state = slot.state.lock();
            if state.in_use || state.is_resting || !state.healthy {
                return None;
            }
            state.in_use = true;
        }

        let alive = timeout(LIVENESS_PROBE_TIMEOUT, self.client.shell(&slot.descriptor.adb_target, "echo ping"))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false);

        if !alive {
            let mut state = slot.state.lock();
            state.in_use = false;
            state.healthy = false;
            return None;
        }

        let mut state = slot.state.lock();
        state.current_task_id = Some(task_id);
        drop(state);

        Some(AcquiredDevice { slot: slot.clone(), task_id })
    }

    /// Classify why acquisition would fail right now, for the timeout path.
    fn classify_unavailability(&self, required_arch: Arch) -> AcquireError {
        let slots = self.slots.lock();
        let matching: Vec<&Arc<DeviceSlot>> =
            slots.iter().filter(|s| required_arch.accepts(s.descriptor.arch)).collect();
        if matching.is_empty() {
            return AcquireError::NoDeviceOfArch(required_arch);
        }
        let any_healthy = matching.iter().any(|s| s.state.lock().healthy);
        if !any_healthy {
            AcquireError::Unhealthy
        } else {
            AcquireError::AllBusy
        }
    }

    /// Block on a polling tick until a matching device is claimed, `ctx` is
    /// cancelled, or `wait_timeout` elapses (`wait_timeout = 0` waits
    /// indefinitely, never timing out — only cancellation can end it).
    pub async fn acquire(
        &self,
        ctx: &CancellationToken,
        task_id: TaskId,
        required_arch: Arch,
        wait_timeout: Duration,
    ) -> Result<AcquiredDevice, AcquireError> {
        let deadline = if wait_timeout.is_zero() { None } else { Some(self.clock.now() + wait_timeout) };

        loop {
            if ctx.is_cancelled() {
                return Err(AcquireError::Cancelled);
            }
            if let Some(acquired) = self.try_select(task_id, required_arch).await {
                return Ok(acquired);
            }
            if let Some(deadline) = deadline {
                if self.clock.now() >= deadline {
                    return Err(self.classify_unavailability(required_arch));
                }
            }
            tokio::select! {
                _ = ctx.cancelled() => return Err(AcquireError::Cancelled),
                _ = tokio::time::sleep(ACQUIRE_POLL_INTERVAL) => {}
            }
        }
    }

    /// Release ownership; if the device's completed-task counter reached
    /// the rest threshold, start a rest window that clears asynchronously.
    pub fn release(&self, pool: &Arc<DevicePool<C>>, acquired: AcquiredDevice) {
        let slot = acquired.slot.clone();
        let should_rest = {
            let mut state = slot.state.lock();
            state.in_use = false;
            state.current_task_id = None;
            state.tasks_completed += 1;
            let policy = *self.rest_policy.lock();
            if state.tasks_completed >= policy.interval {
                state.is_resting = true;
                state.tasks_completed = 0;
                state.last_rest_time_ms = Some(self.clock.epoch_ms());
                true
            } else {
                false
            }
        };

        if should_rest {
            let duration = self.rest_policy.lock().duration;
            let pool = pool.clone();
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                for s in pool.slots.lock().iter() {
                    if Arc::ptr_eq(s, &slot) {
                        s.state.lock().is_resting = false;
                        break;
                    }
                }
            });
        }
    }

    pub fn is_in_use(&self, device_id: &str) -> bool {
        self.slots
            .lock()
            .iter()
            .find(|s| s.descriptor.id == device_id)
            .map(|s| s.state.lock().in_use)
            .unwrap_or(false)
    }

    pub fn current_task_id(&self, device_id: &str) -> Option<TaskId> {
        self.slots
            .lock()
            .iter()
            .find(|s| s.descriptor.id == device_id)
            .and_then(|s| s.state.lock().current_task_id)
    }

    /// Probe each idle device; on failure trigger a best-effort container
    /// restart and certificate reinstallation. Never touches in-use devices
    /// (§4.1).
    pub async fn health_check_loop(self: &Arc<Self>, ctx: CancellationToken, interval: Duration) {
        loop {
            tokio::select! {
                _ = ctx.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }
            let idle: Vec<Arc<DeviceSlot>> =
                self.slots.lock().iter().filter(|s| !s.state.lock().in_use).cloned().collect();
            for slot in idle {
                let alive =
                    timeout(LIVENESS_PROBE_TIMEOUT, self.client.shell(&slot.descriptor.adb_target, "echo ping"))
                        .await
                        .map(|r| r.is_ok())
                        .unwrap_or(false);
                if alive {
                    slot.state.lock().healthy = true;
                    continue;
                }
                tracing::warn!(device_id = %slot.descriptor.id, "health probe failed, restarting container");
                if let Some(restarter) = &self.restarter {
                    let _ = restarter.restart_container(&slot.descriptor.proxy_container).await;
                    let _ = restarter.reinstall_certificate(&slot.descriptor.proxy_container).await;
                }
                let alive_after_restart =
                    timeout(LIVENESS_PROBE_TIMEOUT, self.client.shell(&slot.descriptor.adb_target, "echo ping"))
                        .await
                        .map(|r| r.is_ok())
                        .unwrap_or(false);
                slot.state.lock().healthy = alive_after_restart;
            }
        }
    }
}

#[cfg(test)]
#[path = "device_pool_tests.rs"]
mod tests;
