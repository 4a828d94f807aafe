// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CPU architecture constraint for APKs and devices.

use serde::{Deserialize, Serialize};

/// Architecture an APK requires, or a device provides.
///
/// `Any` on an APK means the package carries no native libraries (or both
/// ARM and x86 variants) and can run on either device family. `Any` never
/// appears on a device descriptor — devices are always concretely ARM or
/// X86; the pool's two-pass scan is what implements "any device will do".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    Arm,
    X86,
    Any,
}

crate::simple_display! {
    Arch {
        Arm => "arm",
        X86 => "x86",
        Any => "any",
    }
}

impl Arch {
    /// Derive the architecture constraint from the set of native-lib ABI
    /// directory names found under `lib/` in an APK's zip central directory
    /// (e.g. `arm64-v8a`, `armeabi-v7a`, `x86_64`).
    pub fn from_abi_dirs<'a>(dirs: impl IntoIterator<Item = &'a str>) -> Self {
        let mut has_arm = false;
        let mut has_x86 = false;
        for dir in dirs {
            if dir.contains("armeabi") || dir.contains("arm64") {
                has_arm = true;
            }
            if dir.contains("x86") {
                has_x86 = true;
            }
        }
        match (has_arm, has_x86) {
            (true, false) => Arch::Arm,
            (false, true) => Arch::X86,
            // Neither (no native libs) or both: any device will do.
            _ => Arch::Any,
        }
    }

    /// Whether a device of architecture `device_arch` may run an APK
    /// requiring `self`.
    pub fn accepts(&self, device_arch: Arch) -> bool {
        match self {
            Arch::Arm => device_arch == Arch::Arm,
            Arch::X86 => device_arch == Arch::X86,
            Arch::Any => true,
        }
    }
}

#[cfg(test)]
#[path = "arch_tests.rs"]
mod tests;
