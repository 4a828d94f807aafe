// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `af device add/list` (§4.13): manage the static device registry
//! persisted in the config file the daemon loads at startup.

use crate::arch_arg::ArchArg;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;
use af_daemon::Config;
use af_engine::DeviceDescriptor;
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum DeviceCommand {
    /// Register a device in the config file's device pool.
    Add {
        id: String,
        adb_target: String,
        proxy_host: String,
        proxy_port: u16,
        proxy_container: String,
        proxy_api_port: u16,
        #[arg(long)]
        instrumentation_host: Option<String>,
        #[arg(long, value_enum, default_value_t = ArchArg::Arm)]
        arch: ArchArg,
    },
    /// List devices in the loaded config's device pool.
    List,
}

pub fn run(command: DeviceCommand, format: OutputFormat) -> Result<(), ExitError> {
    match command {
        DeviceCommand::Add { id, adb_target, proxy_host, proxy_port, proxy_container, proxy_api_port, instrumentation_host, arch } => {
            add(id, adb_target, proxy_host, proxy_port, proxy_container, proxy_api_port, instrumentation_host, arch, format)
        }
        DeviceCommand::List => list(format),
    }
}

#[allow(clippy::too_many_arguments)]
fn add(
    id: String,
    adb_target: String,
    proxy_host: String,
    proxy_port: u16,
    proxy_container: String,
    proxy_api_port: u16,
    instrumentation_host: Option<String>,
    arch: ArchArg,
    format: OutputFormat,
) -> Result<(), ExitError> {
    let mut config = Config::load();
    if config.device_pool.devices.iter().any(|d| d.id == id) {
        return Err(ExitError::new(1, format!("device {id} is already registered")));
    }

    config.device_pool.devices.push(DeviceDescriptor {
        id,
        adb_target,
        proxy_host,
        proxy_port,
        proxy_container,
        proxy_api_port,
        instrumentation_host,
        arch: arch.into(),
    });

    let path = Config::resolve_path_for_write();
    config.save_to_file(&path).map_err(|err| ExitError::new(1, format!("failed to write {}: {err}", path.display())))?;

    crate::output::print_device_list(format, &config.device_pool.devices);
    Ok(())
}

fn list(format: OutputFormat) -> Result<(), ExitError> {
    let config = Config::load();
    crate::output::print_device_list(format, &config.device_pool.devices);
    Ok(())
}
