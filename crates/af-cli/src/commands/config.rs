// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `af config show` (§4.13).

use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};
use af_daemon::Config;
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective merged configuration (file + environment overrides).
    Show,
}

pub fn run(command: ConfigCommand, format: OutputFormat) -> Result<(), ExitError> {
    match command {
        ConfigCommand::Show => {
            let config = Config::load();
            output::print_config(format, &config);
            Ok(())
        }
    }
}
