// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `clap::ValueEnum` mirror of [`af_core::Arch`] — kept separate from the
//! domain type since `Arch` itself has no CLI-parsing concerns.

use af_core::Arch;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArchArg {
    Arm,
    X86,
    Any,
}

impl From<ArchArg> for Arch {
    fn from(value: ArchArg) -> Self {
        match value {
            ArchArg::Arm => Arch::Arm,
            ArchArg::X86 => Arch::X86,
            ArchArg::Any => Arch::Any,
        }
    }
}
