// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component discovery (§4.6): extract activity component FQNs belonging
//! to a package from the platform's package-dump text.

use std::collections::BTreeSet;

const REJECTED_SUFFIXES: &[&str] = &["Provider", "Receiver", "Service", "Application", "Initializer"];
const REJECTED_KEYWORDS: &[&str] = &["ContentProvider", "BroadcastReceiver", "Initializer", "Configurator"];

fn is_rejected(cls: &str) -> bool {
    let segment = cls.rsplit('.').next().unwrap_or(cls);
    if REJECTED_SUFFIXES.iter().any(|suffix| segment.ends_with(suffix)) {
        return true;
    }
    REJECTED_KEYWORDS.iter().any(|keyword| cls.contains(keyword))
}

fn normalize(package: &str, cls: &str) -> String {
    if let Some(rest) = cls.strip_prefix('.') {
        format!("{package}.{rest}")
    } else if !cls.contains('.') {
        format!("{package}.{cls}")
    } else {
        cls.to_string()
    }
}

/// Find every `<package>/<cls>` token in `dump_text`, normalize it into a
/// fully-qualified class name, and reject anything that is not an
/// activity component. Deduplicated, returned in a stable (sorted) order.
pub fn discover_activities(dump_text: &str, package: &str) -> Vec<String> {
    let needle = format!("{package}/");
    let mut found = BTreeSet::new();

    for line in dump_text.lines() {
        let mut search_from = 0;
        while let Some(rel_idx) = line[search_from..].find(&needle) {
            let start = search_from + rel_idx;
            let rest = &line[start + needle.len()..];
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '}' || c == ')' || c == ',')
                .unwrap_or(rest.len());
            let cls = &rest[..end];
            if !cls.is_empty() {
                let normalized = normalize(package, cls);
                if !is_rejected(&normalized) {
                    found.insert(normalized);
                }
            }
            search_from = start + needle.len() + end.max(1);
        }
    }

    found.into_iter().collect()
}

#[cfg(test)]
#[path = "component_discovery_tests.rs"]
mod tests;
