// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::fake::FakeProxyGatewayClient;
use super::*;

#[tokio::test]
async fn set_output_then_clear_output_round_trips() {
    let client = FakeProxyGatewayClient::new();
    client.set_output("10.0.0.5", 8081, "tsk-1").await.unwrap();
    client.clear_output("10.0.0.5", 8081).await.unwrap();
    assert_eq!(client.calls(), vec!["set_output 10.0.0.5:8081 tsk-1", "clear_output 10.0.0.5:8081"]);
}

#[tokio::test]
async fn repeat_clear_output_is_a_no_op() {
    let client = FakeProxyGatewayClient::new();
    client.clear_output("10.0.0.5", 8081).await.unwrap();
    client.clear_output("10.0.0.5", 8081).await.unwrap();
    assert_eq!(client.calls().len(), 2);
}
