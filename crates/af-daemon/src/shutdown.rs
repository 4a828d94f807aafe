// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful shutdown: wait for `SIGINT`/`SIGTERM`, then stop accepting new
//! tasks and drain in-flight ones up to a bounded timeout (§4.14).

use tokio_util::sync::CancellationToken;

/// Resolve once either signal arrives. On non-Unix targets only `SIGINT`
/// (`Ctrl+C`) is observed.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                tracing::error!(%err, "failed to install SIGTERM handler, falling back to SIGINT only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received ctrl-c");
    }
}

/// Drive `token` to cancellation once a shutdown signal arrives. Spawned
/// once at startup; dropping the returned handle has no effect, the task
/// runs for the process lifetime.
pub fn spawn_signal_watcher(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        token.cancel();
    })
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
