// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UI hierarchy dump parsing (§6).
//!
//! Accepts either root form: a standard `<hierarchy rotation=...>` wrapper
//! or a bare `<node>` root from legacy dump tooling. Both normalize into
//! the same [`UiNode`] tree.

use af_core::ui::{Rect, UiNode};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UiDumpError {
    #[error("malformed UI dump XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("UI dump contained no <node> elements")]
    Empty,
}

/// Parse a raw UI hierarchy XML dump into a tree of [`UiNode`]s.
pub fn parse_ui_dump(xml: &str) -> Result<UiNode, UiDumpError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<UiNode> = Vec::new();
    let mut root: Option<UiNode> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if tag.local_name().as_ref() == b"node" => {
                stack.push(node_from_attrs(&tag));
            }
            Event::Empty(tag) if tag.local_name().as_ref() == b"node" => {
                let node = node_from_attrs(&tag);
                attach(&mut stack, &mut root, node);
            }
            Event::End(tag) if tag.local_name().as_ref() == b"node" => {
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or(UiDumpError::Empty)
}

fn attach(stack: &mut Vec<UiNode>, root: &mut Option<UiNode>, node: UiNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else {
        *root = Some(node);
    }
}

fn node_from_attrs(tag: &quick_xml::events::BytesStart) -> UiNode {
    let mut node = UiNode::default();
    for attr in tag.attributes().flatten() {
        let key = attr.key.local_name();
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match key.as_ref() {
            b"text" => node.text = value,
            b"content-desc" => node.content_desc = value,
            b"resource-id" => node.resource_id = value,
            b"class" => node.class = value,
            b"package" => node.package = value,
            b"clickable" => node.clickable = value == "true",
            b"scrollable" => node.scrollable = value == "true",
            b"bounds" => node.bounds = Rect::parse(&value).unwrap_or_default(),
            _ => {}
        }
    }
    node
}

#[cfg(test)]
#[path = "ui_dump_tests.rs"]
mod tests;
