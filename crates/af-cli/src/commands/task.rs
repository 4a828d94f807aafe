// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `af task submit/status/list` (§4.13).

use crate::arch_arg::ArchArg;
use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};
use crate::task_log;
use af_core::{Task, TaskId};
use af_daemon::Config;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Enqueue a task for the given APK.
    Submit {
        apk_path: PathBuf,
        /// Architecture the task should be scheduled to a matching device for.
        #[arg(long, value_enum, default_value_t = ArchArg::Any)]
        arch: ArchArg,
    },
    /// Print one task's status, progress, and failure details.
    Status { task_id: String },
    /// List known tasks, optionally filtered by status.
    List {
        #[arg(long)]
        status: Option<String>,
    },
}

pub fn run(command: TaskCommand, format: OutputFormat) -> Result<(), ExitError> {
    let config = Config::load();
    match command {
        TaskCommand::Submit { apk_path, arch } => submit(&config, apk_path, arch, format),
        TaskCommand::Status { task_id } => status(&config, &task_id, format),
        TaskCommand::List { status: status_filter } => list(&config, status_filter, format),
    }
}

fn submit(config: &Config, apk_path: PathBuf, arch: ArchArg, format: OutputFormat) -> Result<(), ExitError> {
    if !apk_path.is_file() {
        return Err(ExitError::new(1, format!("apk not found: {}", apk_path.display())));
    }
    let task = Task::new(apk_path);
    task_log::append(config, &task).map_err(|err| ExitError::new(1, format!("failed to record task: {err}")))?;

    output::print_task(format, &task);
    if format == OutputFormat::Plain {
        let arch: af_core::Arch = arch.into();
        println!(
            "\n{} standalone mode: task recorded at {} (requested arch: {arch}); start `afd` to actually process it.",
            crate::color::muted("note:"),
            task_log::log_path(config).display()
        );
    }
    Ok(())
}

fn status(config: &Config, task_id: &str, format: OutputFormat) -> Result<(), ExitError> {
    let task_id = TaskId::from_string(task_id);
    match task_log::find(config, task_id) {
        Some(task) => {
            output::print_task(format, &task);
            Ok(())
        }
        None => Err(ExitError::new(1, format!("task {task_id} not found"))),
    }
}

fn list(config: &Config, status_filter: Option<String>, format: OutputFormat) -> Result<(), ExitError> {
    let mut tasks = task_log::read_all(config);
    if let Some(status_filter) = status_filter {
        let wanted = output::parse_status_filter(&status_filter).map_err(|err| ExitError::new(2, err))?;
        tasks.retain(|task| task.status == wanted);
    }
    tasks.sort_by_key(|task| task.task_id.to_string());
    output::print_task_list(format, &tasks);
    Ok(())
}
