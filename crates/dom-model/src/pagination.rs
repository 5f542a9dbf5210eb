//! Pagination control detection (§4.2 "Pagination detection").

use serde::{Deserialize, Serialize};

use crate::model::DomState;

const NEXT_PATTERNS: &[&str] = &["next", "下一页", "more results", ">", "\u{203a}"];
const PREV_PATTERNS: &[&str] = &["previous", "prev", "上一页", "<", "\u{2039}"];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PaginationButtonType {
    Next,
    Previous,
    PageNumber,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaginationButton {
    pub button_type: PaginationButtonType,
    pub backend_node_id: Option<i64>,
    pub text: String,
    pub selector: String,
    pub is_disabled: bool,
}

fn classify(text: &str) -> Option<PaginationButtonType> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    if NEXT_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(PaginationButtonType::Next);
    }
    if PREV_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(PaginationButtonType::Previous);
    }
    if lower.chars().all(|c| c.is_ascii_digit()) {
        return Some(PaginationButtonType::PageNumber);
    }
    None
}

/// Scan the selector map for buttons/links whose text or aria-label
/// matches localized next/previous/page-number patterns.
pub fn detect_pagination_buttons(state: &DomState) -> Vec<PaginationButton> {
    let mut found = Vec::new();
    for node in state.selector_map.values() {
        if !matches!(node.tag.as_str(), "a" | "button") {
            continue;
        }
        let aria_label = node.attributes.get("aria-label").cloned().unwrap_or_default();
        let candidate = if !node.text.trim().is_empty() {
            node.text.clone()
        } else {
            aria_label
        };
        if let Some(button_type) = classify(&candidate) {
            let is_disabled = node.attributes.get("disabled").is_some()
                || node.attributes.get("aria-disabled").map(String::as_str) == Some("true");
            found.push(PaginationButton {
                button_type,
                backend_node_id: None,
                text: candidate.trim().to_string(),
                selector: node.xpath.clone(),
                is_disabled,
            });
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DomElementNode;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn button(text: &str) -> Arc<DomElementNode> {
        Arc::new(DomElementNode {
            tag: "button".into(),
            xpath: "/html/body/button".into(),
            text: text.into(),
            highlight_index: Some(0),
            ..Default::default()
        })
    }

    #[test]
    fn detects_next_button() {
        let mut selector_map = HashMap::new();
        selector_map.insert(0, button("Next"));
        let state = DomState {
            root: None,
            selector_map,
        };
        let buttons = detect_pagination_buttons(&state);
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].button_type, PaginationButtonType::Next);
    }

    #[test]
    fn detects_page_number() {
        let mut selector_map = HashMap::new();
        selector_map.insert(0, button("3"));
        let state = DomState {
            root: None,
            selector_map,
        };
        let buttons = detect_pagination_buttons(&state);
        assert_eq!(buttons[0].button_type, PaginationButtonType::PageNumber);
    }

    #[test]
    fn ignores_unrelated_buttons() {
        let mut selector_map = HashMap::new();
        selector_map.insert(0, button("Submit"));
        let state = DomState {
            root: None,
            selector_map,
        };
        assert!(detect_pagination_buttons(&state).is_empty());
    }
}
