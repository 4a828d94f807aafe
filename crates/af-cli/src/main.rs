// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `af`: thin command surface for submitting tasks, inspecting status, and
//! managing the device registry (§4.13).

mod arch_arg;
mod color;
mod commands;
mod exit_error;
mod output;
mod task_log;

use clap::{Parser, Subcommand};
use commands::{config::ConfigCommand, device::DeviceCommand, task::TaskCommand};
use exit_error::ExitError;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "af",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")"),
    about = "apkfarm task-execution CLI",
    styles = color::styles()
)]
struct Cli {
    /// Emit machine-readable JSON instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: TopCommand,
}

#[derive(Debug, Subcommand)]
enum TopCommand {
    /// Submit, inspect, and list analysis tasks.
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Manage the static device registry.
    Device {
        #[command(subcommand)]
        command: DeviceCommand,
    },
    /// Inspect the effective configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

fn main() {
    let cli = Cli::parse();
    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Plain };

    let result = match cli.command {
        TopCommand::Task { command } => commands::task::run(command, format),
        TopCommand::Device { command } => commands::device::run(command, format),
        TopCommand::Config { command } => commands::config::run(command, format),
    };

    if let Err(err) = result {
        let ExitError { code, message } = err;
        eprintln!("{}: {message}", color::header("error"));
        std::process::exit(code);
    }
}
