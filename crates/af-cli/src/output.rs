// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting: a plain, human-readable mode and a `--json` mode,
//! selected once at the top of `main` and threaded through every command.

use af_core::{Task, TaskStatus};
use af_daemon::Config;
use af_engine::DeviceDescriptor;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Plain,
    Json,
}

pub fn print_task(format: OutputFormat, task: &Task) {
    match format {
        OutputFormat::Json => print_json(task),
        OutputFormat::Plain => {
            println!("{}", crate::color::header("task"));
            println!("  id:               {}", crate::color::literal(&task.task_id.to_string()));
            println!("  status:           {}", crate::color::context(&task.status.to_string()));
            println!("  progress:         {}%", task.progress_percent);
            println!("  current_step:     {}", task.current_step);
            if let Some(package_name) = &task.package_name {
                println!("  package_name:     {package_name}");
            }
            if let Some(failure_type) = task.failure_type {
                println!("  failure_type:     {failure_type}");
            }
            if let Some(error_message) = &task.error_message {
                println!("  error_message:    {error_message}");
            }
            println!("  retry_count:      {}", task.retry_count);
        }
    }
}

pub fn print_task_list(format: OutputFormat, tasks: &[Task]) {
    match format {
        OutputFormat::Json => print_json(tasks),
        OutputFormat::Plain => {
            if tasks.is_empty() {
                println!("no tasks");
                return;
            }
            println!("{:<24} {:<12} {:>4}  {}", crate::color::header("TASK_ID"), "STATUS", "PCT", "PACKAGE");
            for task in tasks {
                println!(
                    "{:<24} {:<12} {:>3}%  {}",
                    crate::color::literal(&task.task_id.to_string()),
                    crate::color::context(&task.status.to_string()),
                    task.progress_percent,
                    task.package_name.as_deref().unwrap_or("-")
                );
            }
        }
    }
}

pub fn print_device_list(format: OutputFormat, devices: &[DeviceDescriptor]) {
    match format {
        OutputFormat::Json => print_json(devices),
        OutputFormat::Plain => {
            if devices.is_empty() {
                println!("no devices registered");
                return;
            }
            println!("{:<16} {:<6} {:<20} {}", crate::color::header("DEVICE_ID"), "ARCH", "ADB_TARGET", "PROXY");
            for device in devices {
                println!(
                    "{:<16} {:<6} {:<20} {}:{}",
                    device.id, device.arch, device.adb_target, device.proxy_host, device.proxy_port
                );
            }
        }
    }
}

pub fn print_config(format: OutputFormat, config: &Config) {
    match format {
        OutputFormat::Json => print_json(config),
        OutputFormat::Plain => {
            println!("{}", crate::color::header("effective configuration"));
            println!("  worker_count:       {}", config.worker_count);
            println!("  adb_bin:            {}", config.adb_bin);
            println!("  state_dir:          {}", config.state_dir.display());
            println!("  devices registered: {}", config.device_pool.devices.len());
            println!("  log_dir:            {}", config.logging.log_dir.display());
            println!("  log_level:          {}", config.logging.log_level);
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("failed to serialize output: {err}"),
    }
}

/// Map a terminal [`TaskStatus`] filter string (`--status queued`, ...) to
/// the enum, for `af task list --status`.
pub fn parse_status_filter(value: &str) -> Result<TaskStatus, String> {
    match value {
        "queued" => Ok(TaskStatus::Queued),
        "installing" => Ok(TaskStatus::Installing),
        "running" => Ok(TaskStatus::Running),
        "collecting" => Ok(TaskStatus::Collecting),
        "completed" => Ok(TaskStatus::Completed),
        "failed" => Ok(TaskStatus::Failed),
        "canceled" => Ok(TaskStatus::Canceled),
        other => Err(format!("unknown status filter: {other}")),
    }
}
