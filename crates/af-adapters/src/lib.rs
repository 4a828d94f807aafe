// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! af-adapters: collaborators at the system boundary — everything that
//! talks to a real device, a real proxy, or a real subprocess.
//!
//! Each collaborator is exposed as a capability trait (per-operation, not
//! per-type) with one production implementation and, gated behind
//! `#[cfg(any(test, feature = "test-support"))]`, a fake recording
//! implementation for the rest of the workspace's tests.

pub mod attributor;
pub mod connection_manager;
pub mod device_client;
pub mod instrumentation;
pub mod k8s_restart;
pub mod packer;
pub mod proxy_gateway;
pub mod static_analysis;
pub mod ui_dump;

pub use connection_manager::{ConnectionError, ConnectionManager};
pub use device_client::{AdbDeviceClient, DeviceClient, DeviceClientError, InstallOutcome};
pub use instrumentation::{CliInstrumentationClient, InstrumentationClient, InstrumentationError, InstrumentationTarget};
pub use k8s_restart::{DeviceRestarter, KubeDeviceRestarter, RestartError};
pub use proxy_gateway::{HttpProxyGatewayClient, ProxyGatewayClient, ProxyGatewayError};
pub use static_analysis::DeepAnalysisPool;

#[cfg(any(test, feature = "test-support"))]
pub use device_client::FakeDeviceClient;
#[cfg(any(test, feature = "test-support"))]
pub use instrumentation::FakeInstrumentationClient;
#[cfg(any(test, feature = "test-support"))]
pub use k8s_restart::FakeDeviceRestarter;
#[cfg(any(test, feature = "test-support"))]
pub use proxy_gateway::FakeProxyGatewayClient;
