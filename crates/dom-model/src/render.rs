//! Deterministic textual rendering of the clickable elements fed to the
//! LLM (§4.2 "Clickable-to-string").
//!
//! Policy: only elements carrying a `highlight_index` appear as their own
//! line; text belonging to non-highlighted elements merges upward until a
//! highlighted ancestor absorbs it.

use std::fmt::Write as _;

use crate::model::DomElementNode;

fn attrs_to_string(node: &DomElementNode) -> String {
    node.attributes
        .iter()
        .map(|(k, v)| format!(r#"{k}="{v}""#))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_node(node: &DomElementNode, depth: usize, out: &mut String) {
    if let Some(idx) = node.highlight_index {
        let indent = "  ".repeat(depth);
        let attrs = attrs_to_string(node);
        let open = if attrs.is_empty() {
            format!("<{}>", node.tag)
        } else {
            format!("<{} {}>", node.tag, attrs)
        };
        let text = merged_text(node);
        let _ = writeln!(out, "{indent}[{idx}]{open}{text}</{}>", node.tag);
    }
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}

/// Own text plus text of any non-highlighted descendant, merged upward
/// until the next highlighted boundary.
fn merged_text(node: &DomElementNode) -> String {
    let mut parts = vec![node.text.clone()];
    collect_unhighlighted_text(node, &mut parts);
    parts
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn collect_unhighlighted_text(node: &DomElementNode, out: &mut Vec<String>) {
    for child in &node.children {
        if child.highlight_index.is_some() {
            continue;
        }
        out.push(child.text.clone());
        collect_unhighlighted_text(child, out);
    }
}

/// Render the full tree starting at `root` into the `[idx]<tag attrs>text</tag>`
/// format, one element per line, indented by depth.
pub fn clickable_elements_to_string(root: &DomElementNode) -> String {
    let mut out = String::new();
    render_node(root, 0, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DomElementNode;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[test]
    fn only_highlighted_elements_get_their_own_line() {
        let mut attrs = BTreeMap::new();
        attrs.insert("type".to_string(), "submit".to_string());
        let button = Arc::new(DomElementNode {
            tag: "button".into(),
            xpath: "/html/body/button".into(),
            attributes: attrs,
            highlight_index: Some(0),
            text: "Submit".into(),
            ..Default::default()
        });
        let span = Arc::new(DomElementNode {
            tag: "span".into(),
            xpath: "/html/body/button/span".into(),
            text: "icon".into(),
            highlight_index: None,
            ..Default::default()
        });
        let root = DomElementNode {
            tag: "div".into(),
            xpath: "/html/body".into(),
            highlight_index: None,
            children: vec![button.clone(), span.clone()],
            ..Default::default()
        };

        let rendered = clickable_elements_to_string(&root);
        assert!(rendered.contains("[0]<button type=\"submit\">Submit</button>"));
        assert!(!rendered.contains("[1]"));
    }

    #[test]
    fn unhighlighted_text_merges_into_highlighted_ancestor() {
        let child = Arc::new(DomElementNode {
            tag: "span".into(),
            xpath: "/html/body/a/span".into(),
            text: "Go home".into(),
            highlight_index: None,
            ..Default::default()
        });
        let link = DomElementNode {
            tag: "a".into(),
            xpath: "/html/body/a".into(),
            highlight_index: Some(0),
            children: vec![child],
            ..Default::default()
        };
        let rendered = clickable_elements_to_string(&link);
        assert!(rendered.contains("Go home"));
    }
}
