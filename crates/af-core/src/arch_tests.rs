// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    arm64_only       = { &["arm64-v8a"], Arch::Arm },
    armeabi_only     = { &["armeabi-v7a"], Arch::Arm },
    x86_only         = { &["x86"], Arch::X86 },
    x86_64_only      = { &["x86_64"], Arch::X86 },
    both             = { &["arm64-v8a", "x86_64"], Arch::Any },
    neither          = { &[], Arch::Any },
    unrelated_abi    = { &["mips"], Arch::Any },
)]
fn from_abi_dirs(dirs: &[&str], expected: Arch) {
    assert_eq!(Arch::from_abi_dirs(dirs.iter().copied()), expected);
}

#[test]
fn arm_device_rejects_x86_apk() {
    assert!(!Arch::X86.accepts(Arch::Arm));
}

#[test]
fn arm_apk_accepts_only_arm_device() {
    assert!(Arch::Arm.accepts(Arch::Arm));
    assert!(!Arch::Arm.accepts(Arch::X86));
}

#[test]
fn any_apk_accepts_either_device() {
    assert!(Arch::Any.accepts(Arch::Arm));
    assert!(Arch::Any.accepts(Arch::X86));
}

#[test]
fn display_matches_taxonomy_strings() {
    assert_eq!(Arch::Arm.to_string(), "arm");
    assert_eq!(Arch::X86.to_string(), "x86");
    assert_eq!(Arch::Any.to_string(), "any");
}
