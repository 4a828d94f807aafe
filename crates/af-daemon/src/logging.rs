// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber installation (§3.3): an `EnvFilter` driven by
//! `APKFARM_LOG` (default `info`), optionally duplicated to a rolling file
//! appender under the configured log directory.

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_FILTER: &str = "APKFARM_LOG";

/// Install the global tracing subscriber. The returned [`WorkerGuard`]
/// must be held for the process lifetime — dropping it flushes and closes
/// the file appender's background writer.
pub fn install(config: &LoggingConfig) -> std::io::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_env(ENV_LOG_FILTER).unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    std::fs::create_dir_all(&config.log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "afd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false);

    if config.stderr {
        let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        tracing_subscriber::registry().with(filter).with(stderr_layer).with(file_layer).init();
    } else {
        tracing_subscriber::registry().with(filter).with(file_layer).init();
    }

    Ok(Some(guard))
}
