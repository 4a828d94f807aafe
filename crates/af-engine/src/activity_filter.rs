// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity component filter (§4.5): given the package's discovered
//! activity FQNs, split them into a selected subset and a filtered-out
//! subset with reasons, and flag which selected activities look like the
//! app's main landing screen.

/// Why a component was excluded from exploration. First-match-wins order
/// matches the rule list below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    ThirdPartySdk,
    EmbeddedSdk,
    ObfuscatedOrTest,
    NameTooShort,
    MeaninglessName,
}

crate::simple_display! {
    FilterReason {
        ThirdPartySdk => "third_party_sdk",
        EmbeddedSdk => "embedded_sdk",
        ObfuscatedOrTest => "obfuscated_or_test",
        NameTooShort => "name_too_short",
        MeaninglessName => "meaningless_name",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredOut {
    pub fqn: String,
    pub reason: FilterReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub selected: Vec<String>,
    pub filtered: Vec<FilteredOut>,
    pub core_activities: Vec<String>,
}

/// Exact FQN prefixes for known analytics/push/crash-reporting SDKs that
/// ship activities of their own (§4.5 rule 1).
const THIRD_PARTY_SDK_PREFIXES: &[&str] = &[
    "com.umeng.", "com.umeng.analytics.", "com.tencent.bugly.", "com.google.android.gms.",
    "com.google.firebase.", "com.facebook.", "com.bytedance.sdk.", "com.igexin.", "com.huawei.hms.",
    "cn.jpush.", "com.xiaomi.mipush.",
];

/// Substrings anywhere in the FQN that mark an embedded third-party SDK
/// even when not at the package root (§4.5 rule 2).
const EMBEDDED_SDK_KEYWORDS: &[&str] = &[".umeng.", ".jpush.", ".bugly.", ".getui.", ".igexin.", ".mipush."];

/// Substrings anywhere in the FQN that mark an obfuscated/test artifact
/// rather than a real screen (§4.5 rule 3).
const OBFUSCATED_OR_TEST_KEYWORDS: &[&str] = &["Test", "$", ".R$", ".BuildConfig"];

/// Short abbreviations that are meaningful despite their length, exempted
/// from the "meaningless short name" rule (§4.5 rule 5).
const MEANINGFUL_ABBREVIATIONS: &[&str] = &["Ui", "Web", "App", "Tab", "Nav", "Pay"];

/// Well-known landing-screen name fragments used only for the "core
/// activity" report annotation (§4.5, last paragraph) — never affects
/// selection.
const CORE_ACTIVITY_PATTERNS: &[&str] =
    &["MainActivity", "SplashActivity", "LoginActivity", "HomeActivity", "WelcomeActivity", "LauncherActivity"];

fn terminal_segment(fqn: &str) -> &str {
    fqn.rsplit('.').next().unwrap_or(fqn)
}

fn is_meaningless_token(segment: &str) -> bool {
    if MEANINGFUL_ABBREVIATIONS.iter().any(|a| *a == segment) {
        return false;
    }
    if segment.len() == 1 {
        return true;
    }
    if segment.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    if segment.len() == 2 {
        let mut chars = segment.chars();
        let first = chars.next().unwrap();
        let second = chars.next().unwrap();
        if first.is_ascii_alphabetic() && second.is_ascii_digit() {
            return true;
        }
    }
    if segment.len() <= 3 && segment.chars().all(|c| c.is_ascii_lowercase()) {
        return true;
    }
    false
}

fn classify(fqn: &str) -> Option<FilterReason> {
    if THIRD_PARTY_SDK_PREFIXES.iter().any(|p| fqn.starts_with(p)) {
        return Some(FilterReason::ThirdPartySdk);
    }
    if EMBEDDED_SDK_KEYWORDS.iter().any(|k| fqn.contains(k)) {
        return Some(FilterReason::EmbeddedSdk);
    }
    if OBFUSCATED_OR_TEST_KEYWORDS.iter().any(|k| fqn.contains(k)) {
        return Some(FilterReason::ObfuscatedOrTest);
    }
    let segment = terminal_segment(fqn);
    if segment.len() < 2 {
        return Some(FilterReason::NameTooShort);
    }
    if is_meaningless_token(segment) {
        return Some(FilterReason::MeaninglessName);
    }
    None
}

fn looks_like_core_activity(fqn: &str) -> bool {
    let segment = terminal_segment(fqn);
    CORE_ACTIVITY_PATTERNS.iter().any(|p| segment.eq_ignore_ascii_case(p))
}

/// Partition discovered activity FQNs into selected / filtered-with-reason,
/// and flag which selected entries look like landing screens.
pub fn filter_components(fqns: &[String]) -> FilterOutcome {
    let mut selected = Vec::new();
    let mut filtered = Vec::new();
    let mut core_activities = Vec::new();

    for fqn in fqns {
        match classify(fqn) {
            Some(reason) => filtered.push(FilteredOut { fqn: fqn.clone(), reason }),
            None => {
                if looks_like_core_activity(fqn) {
                    core_activities.push(fqn.clone());
                }
                selected.push(fqn.clone());
            }
        }
    }

    FilterOutcome { selected, filtered, core_activities }
}

#[cfg(test)]
#[path = "activity_filter_tests.rs"]
mod tests;
