// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide connection singleton (§4.2, §9).
//!
//! The underlying device-control daemon binds a port on first use and is
//! not reentrant; every orchestrator in the process must funnel daemon
//! startup through one serialized path. Shared via dependency injection —
//! callers hold an `Arc<ConnectionManager>` — never through an ambient
//! global, so the test harness can construct a fresh instance per test.

use crate::device_client::{DeviceClient, DeviceClientError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Device(#[from] DeviceClientError),
}

/// Serializes daemon startup and caches per-target connection liveness.
pub struct ConnectionManager {
    client: Arc<dyn DeviceClient>,
    daemon_started: Mutex<bool>,
    cache: RwLock<HashMap<String, bool>>,
}

impl ConnectionManager {
    pub fn new(client: Arc<dyn DeviceClient>) -> Self {
        Self { client, daemon_started: Mutex::new(false), cache: RwLock::new(HashMap::new()) }
    }

    /// Double-checked fast/slow path: most callers hit the fast boolean
    /// check without ever touching the mutex's critical section twice.
    pub async fn ensure_daemon_started(&self) -> Result<(), ConnectionError> {
        if *self.daemon_started.lock() {
            return Ok(());
        }
        let mut started = self.daemon_started.lock();
        if *started {
            return Ok(());
        }
        self.client.devices().await?;
        *started = true;
        Ok(())
    }

    pub async fn connect(&self, target: &str) -> Result<(), ConnectionError> {
        self.ensure_daemon_started().await?;
        self.client.connect(target).await?;
        self.cache.write().insert(target.to_string(), true);
        Ok(())
    }

    pub async fn disconnect(&self, target: &str) -> Result<(), ConnectionError> {
        self.client.disconnect(target).await?;
        self.cache.write().insert(target.to_string(), false);
        Ok(())
    }

    /// Cache hit short-circuits; a cache miss or stale entry re-verifies
    /// against `devices()` output before answering.
    pub async fn is_connected(&self, target: &str) -> Result<bool, ConnectionError> {
        if let Some(&cached) = self.cache.read().get(target) {
            if cached {
                return Ok(true);
            }
        }
        let listing = self.client.devices().await?;
        let live = listing.lines().any(|line| line.starts_with(target) && line.contains("device"));
        self.cache.write().insert(target.to_string(), live);
        Ok(live)
    }
}

#[cfg(test)]
#[path = "connection_manager_tests.rs"]
mod tests;
