// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the per-device proxy's admin API (§4.3, §6).
//!
//! Reroutes a proxy instance's capture output to a task-specific sink and
//! reverts it — the isolation primitive that lets the attributor read one
//! task's flows without demultiplexing a shared stream.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const ADMIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ProxyGatewayError {
    #[error("proxy admin request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("proxy admin endpoint returned status {0}")]
    Status(u16),
}

#[derive(Serialize)]
struct SetOutputBody<'a> {
    task_id: &'a str,
}

#[async_trait]
pub trait ProxyGatewayClient: Send + Sync + 'static {
    async fn set_output(&self, host: &str, api_port: u16, task_id: &str) -> Result<(), ProxyGatewayError>;
    async fn clear_output(&self, host: &str, api_port: u16) -> Result<(), ProxyGatewayError>;
}

pub struct HttpProxyGatewayClient {
    http: reqwest::Client,
}

impl HttpProxyGatewayClient {
    pub fn new() -> Self {
        Self { http: reqwest::Client::builder().timeout(ADMIN_TIMEOUT).build().expect("reqwest client") }
    }

    async fn post(&self, url: &str, body: impl Serialize + Send) -> Result<(), ProxyGatewayError> {
        let response = self.http.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(ProxyGatewayError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

impl Default for HttpProxyGatewayClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProxyGatewayClient for HttpProxyGatewayClient {
    async fn set_output(&self, host: &str, api_port: u16, task_id: &str) -> Result<(), ProxyGatewayError> {
        let url = format!("http://{host}:{api_port}/set_output");
        self.post(&url, SetOutputBody { task_id }).await
    }

    async fn clear_output(&self, host: &str, api_port: u16) -> Result<(), ProxyGatewayError> {
        let url = format!("http://{host}:{api_port}/clear_output");
        self.post(&url, serde_json::json!({})).await
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    pub struct FakeProxyGatewayClient {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeProxyGatewayClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ProxyGatewayClient for FakeProxyGatewayClient {
        async fn set_output(&self, host: &str, api_port: u16, task_id: &str) -> Result<(), ProxyGatewayError> {
            self.calls.lock().push(format!("set_output {host}:{api_port} {task_id}"));
            Ok(())
        }

        async fn clear_output(&self, host: &str, api_port: u16) -> Result<(), ProxyGatewayError> {
            self.calls.lock().push(format!("clear_output {host}:{api_port}"));
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProxyGatewayClient;

#[cfg(test)]
#[path = "proxy_gateway_tests.rs"]
mod tests;
