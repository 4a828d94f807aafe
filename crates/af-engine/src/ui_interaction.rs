// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UI-guided interaction loop (§4.7): guidance (dismiss launch-time
//! onboarding) and exploration (per-activity interaction), both driven by
//! the same safety checks and page classification.

use af_adapters::ui_dump::parse_ui_dump;
use af_adapters::DeviceClient;
use af_core::{is_safe_click_point, Clock, LoginStrategy, PageClass, Rect, UiNode};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UiInteractionError {
    #[error("device client error: {0}")]
    Device(#[from] af_adapters::DeviceClientError),
    #[error("failed to parse UI dump: {0}")]
    UiDump(#[from] af_adapters::ui_dump::UiDumpError),
}

/// System packages allowed to own the element under a click even though
/// they are not the target package (§4.7 safety checks).
const SYSTEM_DIALOG_ALLOWLIST: &[&str] = &["com.android.permissioncontroller", "com.google.android.packageinstaller", "com.android.packageinstaller"];

/// Packages a click must never land in, regardless of position (§4.7).
const DANGEROUS_PACKAGE_BLOCKLIST: &[&str] = &["com.android.systemui", "com.android.launcher", "com.android.settings"];

/// Keywords whose presence anywhere on the page counts as a "guidance
/// marker" for the step-4 consecutive-rounds exit check.
const GUIDANCE_MARKER_KEYWORDS: &[&str] =
    &["agree", "permission", "privacy", "login", "sign in", "update", "skip", "next", "guide", "welcome"];

/// Keywords marking a page as "usable" bottom navigation (step 3).
const BOTTOM_NAV_KEYWORDS: &[&str] = &["home", "category", "cart", "mine", "profile", "discover"];

const PERMISSION_KEYWORDS: &[&str] = &["allow", "while using the app", "only this time", "grant"];
const AGREEMENT_EXPLICIT_KEYWORDS: &[&str] = &["agree and continue", "accept and continue", "i agree"];
const AGE_VERIFICATION_KEYWORDS: &[&str] = &["i am over", "visitor", "age verification"];
const GUARDIAN_CONSENT_KEYWORDS: &[&str] = &["guardian", "parent consent", "parental"];
const LOGIN_KEYWORDS: &[&str] = &["sign in", "log in", "login", "phone number", "verification code"];
const UPDATE_KEYWORDS: &[&str] = &["new version", "update now", "later"];
const AD_KEYWORDS: &[&str] = &["skip ad", "skip in", "advertisement"];
const GUIDE_KEYWORDS: &[&str] = &["next", "start", "get started", "swipe"];

/// System packages whose presence as the page owner overrides every text
/// heuristic and forces `Permission` classification.
const PERMISSION_CONTROLLER_PACKAGES: &[&str] = &["com.android.permissioncontroller", "com.google.android.permissioncontroller"];

fn count_keyword_hits(root: &UiNode, keywords: &[&str]) -> usize {
    root.iter().filter(|n| keywords.iter().any(|k| n.text_contains(k))).count()
}

fn has_any_keyword(root: &UiNode, keywords: &[&str]) -> bool {
    root.iter().any(|n| keywords.iter().any(|k| n.text_contains(k)))
}

pub fn has_bottom_navigation_markers(root: &UiNode) -> bool {
    count_keyword_hits(root, BOTTOM_NAV_KEYWORDS) >= 2
}

pub fn has_guidance_markers(root: &UiNode) -> bool {
    has_any_keyword(root, GUIDANCE_MARKER_KEYWORDS)
}

/// Classify a dumped page into one of §4.7's eight classes. System
/// permission-controller packages override text heuristics entirely.
pub fn classify_page(root: &UiNode, page_owner_package: &str) -> PageClass {
    if PERMISSION_CONTROLLER_PACKAGES.iter().any(|p| *p == page_owner_package) {
        return PageClass::Permission;
    }
    if has_any_keyword(root, PERMISSION_KEYWORDS) {
        return PageClass::Permission;
    }
    if has_any_keyword(root, AGREEMENT_EXPLICIT_KEYWORDS)
        || has_any_keyword(root, AGE_VERIFICATION_KEYWORDS)
        || has_any_keyword(root, GUARDIAN_CONSENT_KEYWORDS)
    {
        return PageClass::Agreement;
    }
    if has_any_keyword(root, LOGIN_KEYWORDS) {
        return PageClass::Login;
    }
    if has_any_keyword(root, UPDATE_KEYWORDS) {
        return PageClass::Update;
    }
    if has_any_keyword(root, AD_KEYWORDS) {
        return PageClass::Ad;
    }
    if has_bottom_navigation_markers(root) && !has_guidance_markers(root) {
        return PageClass::MainUi;
    }
    if has_any_keyword(root, GUIDE_KEYWORDS) {
        return PageClass::Guide;
    }
    PageClass::Unknown
}

/// Hash of the page shape with bounds stripped, for the stability tie-break
/// fallback (§4.7 step 5).
pub fn stability_hash(root: &UiNode) -> u64 {
    let mut hasher = DefaultHasher::new();
    for node in root.iter() {
        node.text.hash(&mut hasher);
        node.content_desc.hash(&mut hasher);
        node.resource_id.hash(&mut hasher);
        node.class.hash(&mut hasher);
        node.clickable.hash(&mut hasher);
    }
    hasher.finish()
}

/// An interaction the caller should perform against the device.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Tap { x: i32, y: i32 },
    Swipe { x1: i32, y1: i32, x2: i32, y2: i32 },
    PressBack,
    PressHome,
    Wait,
}

/// Whether a click at `(x, y)`, which hits `node`, may proceed against
/// `target_package` (§4.7 safety checks).
pub fn is_click_safe(node: Option<&UiNode>, target_package: &str, x: i32, y: i32, screen_w: i32, screen_h: i32) -> bool {
    if !is_safe_click_point(x, y, screen_w, screen_h) {
        return false;
    }
    let Some(node) = node else { return true };
    if node.package.is_empty() || node.package == target_package {
        return true;
    }
    if SYSTEM_DIALOG_ALLOWLIST.iter().any(|p| *p == node.package) {
        return true;
    }
    !DANGEROUS_PACKAGE_BLOCKLIST.iter().any(|p| *p == node.package)
}

fn first_clickable_matching<'a>(root: &'a UiNode, keywords: &[&str]) -> Option<&'a UiNode> {
    root.iter().find(|n| n.clickable && keywords.iter().any(|k| n.text_contains(k)))
}

fn checkbox_near_agreement_text(root: &UiNode) -> Option<&UiNode> {
    root.iter().find(|n| n.class.to_lowercase().contains("checkbox"))
}

fn has_any_action_button(root: &UiNode) -> bool {
    root.iter().any(|n| n.clickable)
}

/// Pick the single action §4.7 step 7 prescribes for `page_class`.
pub fn pick_guidance_action(page_class: PageClass, root: &UiNode) -> Action {
    match page_class {
        PageClass::Permission => first_clickable_matching(root, PERMISSION_KEYWORDS)
            .map(|n| tap_center(n))
            .unwrap_or(Action::Wait),
        PageClass::Agreement => first_clickable_matching(root, AGREEMENT_EXPLICIT_KEYWORDS)
            .or_else(|| first_clickable_matching(root, AGE_VERIFICATION_KEYWORDS))
            .or_else(|| first_clickable_matching(root, GUARDIAN_CONSENT_KEYWORDS))
            .map(|n| tap_center(n))
            .or_else(|| checkbox_near_agreement_text(root).map(|n| tap_center(n)))
            .unwrap_or_else(|| if has_any_action_button(root) { Action::Wait } else { Action::PressBack }),
        PageClass::Update => first_clickable_matching(root, &["later"]).map(|n| tap_center(n)).unwrap_or(Action::Wait),
        PageClass::Ad => first_clickable_matching(root, &["skip"]).map(|n| tap_center(n)).unwrap_or(Action::Wait),
        PageClass::Login => pick_login_bypass_action(LoginStrategy::ORDER[0], root),
        PageClass::Guide => first_clickable_matching(root, &["next", "start"])
            .map(|n| tap_center(n))
            .unwrap_or(Action::Swipe { x1: 800, y1: 1000, x2: 200, y2: 1000 }),
        PageClass::MainUi | PageClass::Unknown => Action::Wait,
    }
}

fn tap_center(node: &UiNode) -> Action {
    let (x, y) = node.bounds.center();
    Action::Tap { x, y }
}

/// Build the action for a single login-bypass strategy (§4.7's ordered
/// strategy list). The caller drives the retry loop across
/// [`LoginStrategy::ORDER`], re-verifying the foreground package between
/// attempts.
pub fn pick_login_bypass_action(strategy: LoginStrategy, root: &UiNode) -> Action {
    match strategy {
        LoginStrategy::SkipOrVisitor => first_clickable_matching(root, &["skip", "visitor", "later"])
            .map(tap_center)
            .unwrap_or(Action::PressBack),
        LoginStrategy::TopRightClose => root
            .iter()
            .find(|n| n.clickable && is_top_right(&n.bounds))
            .map(tap_center)
            .unwrap_or(Action::PressBack),
        LoginStrategy::NonMineTab => root
            .iter()
            .find(|n| n.clickable && is_bottom_tab(&n.bounds) && !n.text_contains("mine") && !n.text_contains("profile"))
            .map(tap_center)
            .unwrap_or(Action::PressBack),
        LoginStrategy::Back => Action::PressBack,
    }
}

fn is_top_right(bounds: &Rect) -> bool {
    bounds.y1 < 300 && bounds.x1 > 700
}

fn is_bottom_tab(bounds: &Rect) -> bool {
    bounds.y1 > 1500
}

/// Outcome of the guidance loop (§4.7).
#[derive(Debug, Clone, PartialEq)]
pub enum GuidanceOutcome {
    Reached { rounds: u32 },
    LoginRequired { rounds: u32 },
    Exhausted { rounds: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct GuidanceConfig {
    pub max_rounds: u32,
    pub no_guidance_marker_rounds: u32,
    pub stable_hash_rounds: u32,
    pub screen_width: i32,
    pub screen_height: i32,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self { max_rounds: 20, no_guidance_marker_rounds: 3, stable_hash_rounds: 5, screen_width: 1080, screen_height: 2280 }
    }
}

/// Run the guidance loop against `target` (§4.7). `apply` is invoked with
/// the chosen action each round; the caller owns translating it into
/// device-client calls (tap/swipe/keyevent) and re-reading the foreground
/// package, since both depend on the device-scoped client set bound by the
/// orchestrator.
pub async fn run_guidance_loop<C, F, Fut>(
    client: &C,
    target: &str,
    adb_target: &str,
    config: GuidanceConfig,
    mut apply: F,
) -> Result<GuidanceOutcome, UiInteractionError>
where
    C: DeviceClient + ?Sized,
    F: FnMut(Action) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut no_guidance_rounds = 0u32;
    let mut stable_rounds = 0u32;
    let mut last_hash: Option<u64> = None;

    for round in 0..config.max_rounds {
        if client.foreground_package(adb_target).await?.as_deref() != Some(target) {
            let _ = client.shell(adb_target, &format!("monkey -p {target} -c android.intent.category.LAUNCHER 1")).await;
        }

        let xml = client.ui_dump(adb_target).await?;
        let root = parse_ui_dump(&xml)?;

        if has_bottom_navigation_markers(&root) && !has_guidance_markers(&root) {
            return Ok(GuidanceOutcome::Reached { rounds: round + 1 });
        }

        if has_guidance_markers(&root) {
            no_guidance_rounds = 0;
        } else {
            no_guidance_rounds += 1;
            if no_guidance_rounds >= config.no_guidance_marker_rounds {
                return Ok(GuidanceOutcome::Reached { rounds: round + 1 });
            }
        }

        let hash = stability_hash(&root);
        if last_hash == Some(hash) {
            stable_rounds += 1;
            if stable_rounds >= config.stable_hash_rounds {
                return Ok(GuidanceOutcome::Reached { rounds: round + 1 });
            }
        } else {
            stable_rounds = 0;
        }
        last_hash = Some(hash);

        let page_class = classify_page(&root, target);
        if page_class == PageClass::Login {
            for strategy in LoginStrategy::ORDER {
                let action = pick_login_bypass_action(strategy, &root);
                apply(action).await;
                tokio::time::sleep(Duration::from_millis(300)).await;
                if client.foreground_package(adb_target).await?.as_deref() != Some(target) {
                    return Ok(GuidanceOutcome::LoginRequired { rounds: round + 1 });
                }
                let xml = client.ui_dump(adb_target).await?;
                let reclassified = classify_page(&parse_ui_dump(&xml)?, target);
                if reclassified != PageClass::Login {
                    break;
                }
                if strategy == LoginStrategy::Back {
                    return Ok(GuidanceOutcome::LoginRequired { rounds: round + 1 });
                }
            }
            continue;
        }

        apply(pick_guidance_action(page_class, &root)).await;
    }

    Ok(GuidanceOutcome::Exhausted { rounds: config.max_rounds })
}

/// Keywords tried, in priority order, before the swipe fallback when no AI
/// planner is configured (§4.7 exploration step 3 heuristic fallback).
const DEEP_EXPLORATION_KEYWORDS: &[&str] = &["more", "view all", "detail", "expand", "see more"];

/// Injectable capability for ranking exploration actions from a UI dump.
/// Defaults to absent — the heuristic fallback in [`run_exploration_phase`]
/// always runs when no planner is configured (§4.7: this is a pluggability
/// point, not a scope reduction).
#[async_trait]
pub trait ActionPlanner: Send + Sync + 'static {
    async fn plan(&self, root: &UiNode, target_package: &str) -> Vec<Action>;
}

#[derive(Debug, Clone, Copy)]
pub struct ExplorationConfig {
    pub post_launch_wait: Duration,
    pub inter_action_wait: Duration,
    pub screen_width: i32,
    pub screen_height: i32,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            post_launch_wait: Duration::from_secs(3),
            inter_action_wait: Duration::from_millis(500),
            screen_width: 1080,
            screen_height: 2280,
        }
    }
}

/// Outcome of exploring one activity (§4.4 step 13, §4.12's `ActivityDetail`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorationRecord {
    pub activity: String,
    pub launch_failed: bool,
    pub start_time: f64,
    pub end_time: f64,
}

fn epoch_seconds(clock: &impl Clock) -> f64 {
    clock.epoch_ms() as f64 / 1000.0
}

/// Whether `action` may be applied, per the same safety checks every click
/// in the guidance loop is subject to (§4.7 safety checks).
fn is_action_safe(action: &Action, root: &UiNode, target_package: &str, screen_w: i32, screen_h: i32) -> bool {
    match action {
        Action::Tap { x, y } => is_click_safe(root.hit_test(*x, *y), target_package, *x, *y, screen_w, screen_h),
        Action::Swipe { x1, y1, x2, y2 } => {
            is_safe_click_point(*x1, *y1, screen_w, screen_h) && is_safe_click_point(*x2, *y2, screen_w, screen_h)
        }
        Action::PressBack | Action::PressHome | Action::Wait => true,
    }
}

/// Deep-exploration heuristic fallback: priority-ordered keyword clicks,
/// then two vertical and two horizontal swipes (§4.7 exploration step 3).
pub fn deep_exploration_heuristics(root: &UiNode, screen_w: i32, screen_h: i32) -> Vec<Action> {
    let mut actions: Vec<Action> = DEEP_EXPLORATION_KEYWORDS
        .iter()
        .filter_map(|keyword| first_clickable_matching(root, &[keyword]))
        .map(tap_center)
        .collect();

    let mid_x = screen_w / 2;
    let mid_y = screen_h / 2;
    let top = (screen_h as f32 * 0.25) as i32;
    let bottom = (screen_h as f32 * 0.75) as i32;
    let left = (screen_w as f32 * 0.2) as i32;
    let right = (screen_w as f32 * 0.8) as i32;

    actions.push(Action::Swipe { x1: mid_x, y1: bottom, x2: mid_x, y2: top });
    actions.push(Action::Swipe { x1: mid_x, y1: top, x2: mid_x, y2: bottom });
    actions.push(Action::Swipe { x1: right, y1: mid_y, x2: left, y2: mid_y });
    actions.push(Action::Swipe { x1: left, y1: mid_y, x2: right, y2: mid_y });

    actions
}

/// Explore a single activity (§4.7 exploration phase). Launches it,
/// screenshots and dumps its UI, runs either the injected planner's action
/// plan or the heuristic fallback (both safety-checked identically to the
/// guidance loop), presses home, and records the time range the attributor
/// will use to assign intercepted flows to this activity.
#[allow(clippy::too_many_arguments)]
pub async fn run_exploration_phase<C, P, CL, F, Fut>(
    client: &C,
    clock: &CL,
    target: &str,
    adb_target: &str,
    activity: &str,
    screenshot_dst: &str,
    config: &ExplorationConfig,
    planner: Option<&P>,
    mut apply: F,
) -> Result<ExplorationRecord, UiInteractionError>
where
    C: DeviceClient + ?Sized,
    P: ActionPlanner + ?Sized,
    CL: Clock,
    F: FnMut(Action) -> Fut,
    Fut: Future<Output = ()>,
{
    let start_time = epoch_seconds(clock);

    client.shell(adb_target, &format!("am start -n {target}/{activity}")).await?;
    tokio::time::sleep(config.post_launch_wait).await;

    let mut launch_failed = false;
    if client.foreground_package(adb_target).await?.as_deref() != Some(target) {
        launch_failed = true;
        let _ = client.shell(adb_target, &format!("monkey -p {target} -c android.intent.category.LAUNCHER 1")).await;
        tokio::time::sleep(config.post_launch_wait).await;
    }

    client.screenshot(adb_target, screenshot_dst).await?;
    let xml = client.ui_dump(adb_target).await?;
    let root = parse_ui_dump(&xml)?;

    let actions = match planner {
        Some(planner) => planner.plan(&root, target).await,
        None => deep_exploration_heuristics(&root, config.screen_width, config.screen_height),
    };

    for action in actions {
        if is_action_safe(&action, &root, target, config.screen_width, config.screen_height) {
            apply(action).await;
            tokio::time::sleep(config.inter_action_wait).await;
        }
    }

    apply(Action::PressHome).await;

    let end_time = epoch_seconds(clock);

    Ok(ExplorationRecord { activity: activity.to_string(), launch_failed, start_time, end_time })
}

#[cfg(test)]
#[path = "ui_interaction_tests.rs"]
mod tests;
