// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UI tree vocabulary shared between the adapters crate (which parses the
//! device's XML dump into these types) and the engine crate (which
//! classifies and acts on them). Kept dependency-free so both sides agree
//! on the shape without either owning an XML parser dependency.

use serde::{Deserialize, Serialize};

/// On-screen bounding box, inclusive top-left / exclusive bottom-right, in
/// device pixels. Parsed from the dump's `"[x1,y1][x2,y2]"` bounds string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub fn center(&self) -> (i32, i32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Parse the device dump's `"[x1,y1][x2,y2]"` bounds attribute.
    pub fn parse(s: &str) -> Option<Rect> {
        let s = s.trim();
        let s = s.strip_prefix('[')?;
        let (first, rest) = s.split_once(']')?;
        let rest = rest.strip_prefix('[')?;
        let second = rest.strip_suffix(']')?;
        let (x1, y1) = first.split_once(',')?;
        let (x2, y2) = second.split_once(',')?;
        Some(Rect {
            x1: x1.trim().parse().ok()?,
            y1: y1.trim().parse().ok()?,
            x2: x2.trim().parse().ok()?,
            y2: y2.trim().parse().ok()?,
        })
    }
}

/// One node of the UI hierarchy dump, after normalizing either the
/// `<hierarchy>` or bare `<node>` root form (§6) into a common tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiNode {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub content_desc: String,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub clickable: bool,
    #[serde(default)]
    pub scrollable: bool,
    #[serde(default)]
    pub bounds: Rect,
    #[serde(default)]
    pub children: Vec<UiNode>,
}

impl UiNode {
    /// Depth-first iterator over this node and all of its descendants.
    pub fn iter(&self) -> impl Iterator<Item = &UiNode> {
        UiNodeIter { stack: vec![self] }
    }

    /// Whether any text or content-description on this node contains
    /// `needle`, case-insensitively.
    pub fn text_contains(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.text.to_lowercase().contains(&needle) || self.content_desc.to_lowercase().contains(&needle)
    }

    /// The node at the given screen coordinate with the smallest bounding
    /// box (deepest match), or `None` if the point is outside every node.
    pub fn hit_test(&self, x: i32, y: i32) -> Option<&UiNode> {
        let mut best: Option<&UiNode> = None;
        for node in self.iter() {
            let b = node.bounds;
            if x >= b.x1 && x < b.x2 && y >= b.y1 && y < b.y2 {
                best = match best {
                    Some(cur) if cur.bounds.width() as i64 * cur.bounds.height() as i64
                        <= node.bounds.width() as i64 * node.bounds.height() as i64 =>
                    {
                        Some(cur)
                    }
                    _ => Some(node),
                };
            }
        }
        best
    }
}

struct UiNodeIter<'a> {
    stack: Vec<&'a UiNode>,
}

impl<'a> Iterator for UiNodeIter<'a> {
    type Item = &'a UiNode;

    fn next(&mut self) -> Option<&'a UiNode> {
        let node = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

/// Guidance-page classification (§4.7 step 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageClass {
    Permission,
    Agreement,
    Login,
    Guide,
    Ad,
    Update,
    MainUi,
    Unknown,
}

crate::simple_display! {
    PageClass {
        Permission => "permission",
        Agreement => "agreement",
        Login => "login",
        Guide => "guide",
        Ad => "ad",
        Update => "update",
        MainUi => "main_ui",
        Unknown => "unknown",
    }
}

/// Login-bypass strategy, tried in this declared order (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginStrategy {
    SkipOrVisitor,
    TopRightClose,
    NonMineTab,
    Back,
}

crate::simple_display! {
    LoginStrategy {
        SkipOrVisitor => "skip_or_visitor",
        TopRightClose => "top_right_close",
        NonMineTab => "non_mine_tab",
        Back => "back",
    }
}

impl LoginStrategy {
    /// Strategies in priority order.
    pub const ORDER: [LoginStrategy; 4] =
        [LoginStrategy::SkipOrVisitor, LoginStrategy::TopRightClose, LoginStrategy::NonMineTab, LoginStrategy::Back];
}

/// Status-bar height, below which clicks are unsafe (§4.7 safety checks).
pub const STATUS_BAR_HEIGHT: i32 = 75;
/// Distance from the screen bottom reserved for the navigation bar.
pub const NAV_BAR_HEIGHT: i32 = 150;
/// Margin from any screen edge within which clicks are unsafe.
pub const EDGE_MARGIN: i32 = 20;

/// Whether a click at `(x, y)` on a `screen_width x screen_height` screen is
/// safe per §4.7's status-bar / nav-bar / edge-margin rules.
pub fn is_safe_click_point(x: i32, y: i32, screen_width: i32, screen_height: i32) -> bool {
    if y < STATUS_BAR_HEIGHT {
        return false;
    }
    if y > screen_height - NAV_BAR_HEIGHT {
        return false;
    }
    if x < EDGE_MARGIN || x > screen_width - EDGE_MARGIN {
        return false;
    }
    if y < EDGE_MARGIN || y > screen_height - EDGE_MARGIN {
        return false;
    }
    true
}

#[cfg(test)]
#[path = "ui_tests.rs"]
mod tests;
