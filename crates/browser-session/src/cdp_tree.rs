//! Best-effort builder from a raw `DOMSnapshot.captureSnapshot` payload
//! (`cdp_adapter::commands::DomSnapshotResult`) to a `dom_model::DomElementNode`
//! tree. The CDP/transport wire format itself is out of scope for this
//! system (§1 "out of scope" — the system consumes a driver that already
//! exposes page/context/CDP primitives); this module is the thin seam
//! where that external shape is translated into the DOM Model the rest of
//! the crate operates on.

use std::collections::BTreeMap;
use std::sync::Arc;

use cdp_adapter::commands::DomSnapshotResult;
use dom_model::DomElementNode;

const INTERACTIVE_TAGS: &[&str] = &[
    "a", "button", "input", "select", "textarea", "option", "label", "summary", "details",
];

struct RawNode {
    backend_node_id: Option<i64>,
    node_name: String,
    attributes: BTreeMap<String, String>,
    parent_index: i64,
    text: String,
    bounds: Option<(f64, f64, f64, f64)>,
}

fn string_at(strings: &[String], idx: i64) -> String {
    if idx < 0 {
        return String::new();
    }
    strings.get(idx as usize).cloned().unwrap_or_default()
}

fn parse_attributes(strings: &[String], pairs: &[i64]) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    let mut iter = pairs.chunks_exact(2);
    for pair in &mut iter {
        let key = string_at(strings, pair[0]);
        let value = string_at(strings, pair[1]);
        if !key.is_empty() {
            attrs.insert(key, value);
        }
    }
    attrs
}

fn as_i64_array(value: &serde_json::Value, key: &str) -> Vec<i64> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|x| x.as_i64()).collect())
        .unwrap_or_default()
}

/// Parses one `documents[i]` entry into a flat list of raw nodes, indexed
/// by their position in the document's `nodes` table.
fn parse_document(doc: &serde_json::Value, strings: &[String]) -> Vec<RawNode> {
    let nodes = match doc.get("nodes") {
        Some(n) => n,
        None => return Vec::new(),
    };

    let node_name_idx = as_i64_array(nodes, "nodeName");
    let backend_ids = as_i64_array(nodes, "backendNodeId");
    let parent_idx = as_i64_array(nodes, "parentIndex");
    let text_value_idx = as_i64_array(nodes, "textValue");

    let attr_lists: Vec<Vec<i64>> = nodes
        .get("attributes")
        .and_then(|v| v.as_array())
        .map(|outer| {
            outer
                .iter()
                .map(|inner| {
                    inner
                        .as_array()
                        .map(|arr| arr.iter().filter_map(|x| x.as_i64()).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default();

    let count = node_name_idx.len();
    let mut bounds_by_node: BTreeMap<usize, (f64, f64, f64, f64)> = BTreeMap::new();
    if let Some(layout) = doc.get("layout") {
        let layout_node_index = as_i64_array(layout, "nodeIndex");
        if let Some(bounds_arr) = layout.get("bounds").and_then(|v| v.as_array()) {
            for (i, node_idx) in layout_node_index.iter().enumerate() {
                if let Some(quad) = bounds_arr.get(i).and_then(|v| v.as_array()) {
                    if quad.len() >= 4 {
                        let x = quad[0].as_f64().unwrap_or(0.0);
                        let y = quad[1].as_f64().unwrap_or(0.0);
                        let w = quad[2].as_f64().unwrap_or(0.0);
                        let h = quad[3].as_f64().unwrap_or(0.0);
                        bounds_by_node.insert(*node_idx as usize, (x, y, w, h));
                    }
                }
            }
        }
    }

    let mut raw = Vec::with_capacity(count);
    for i in 0..count {
        let node_name = string_at(strings, node_name_idx[i]).to_lowercase();
        let attrs = attr_lists
            .get(i)
            .map(|pairs| parse_attributes(strings, pairs))
            .unwrap_or_default();
        let text = text_value_idx
            .get(i)
            .map(|idx| string_at(strings, *idx))
            .unwrap_or_default();
        raw.push(RawNode {
            backend_node_id: backend_ids.get(i).copied(),
            node_name,
            attributes: attrs,
            parent_index: parent_idx.get(i).copied().unwrap_or(-1),
            text,
            bounds: bounds_by_node.get(&i).copied(),
        });
    }
    raw
}

fn is_interactive(tag: &str, attrs: &BTreeMap<String, String>) -> bool {
    INTERACTIVE_TAGS.contains(&tag)
        || attrs.get("role").map(|r| {
            matches!(
                r.as_str(),
                "button" | "link" | "checkbox" | "menuitem" | "option" | "tab" | "textbox"
            )
        }) == Some(true)
        || attrs.contains_key("onclick")
        || attrs.get("tabindex").is_some()
}

fn xpath_for(nodes: &[RawNode], index: usize) -> String {
    let mut segments = Vec::new();
    let mut current = index as i64;
    while current >= 0 {
        let node = &nodes[current as usize];
        let tag = if node.node_name.is_empty() {
            "node".to_string()
        } else {
            node.node_name.clone()
        };
        segments.push(tag);
        current = node.parent_index;
    }
    segments.reverse();
    format!("/{}", segments.join("/"))
}

/// Builds the element tree + selector map for one document, assigning
/// contiguous `highlight_index` values to interactive, visible elements
/// in document order (§3 "highlight_index values ... are contiguous and
/// unique per snapshot").
pub fn build_tree(
    result: &DomSnapshotResult,
    viewport_width: f64,
    viewport_height: f64,
) -> Option<Arc<DomElementNode>> {
    let doc = result.documents.first()?;
    let raw = parse_document(doc, &result.strings);
    if raw.is_empty() {
        return None;
    }

    let mut highlight_counter: u32 = 0;
    let mut built: Vec<Option<Arc<DomElementNode>>> = vec![None; raw.len()];

    // CDP's snapshot lists nodes so that a parent always precedes its
    // children (`parentIndex` only ever points backward), so a single
    // forward pass can build children bottom-up by deferring to a second
    // pass; we instead build from the end so every child is constructed
    // before its parent needs to reference it.
    for i in (0..raw.len()).rev() {
        let node = &raw[i];
        let children: Vec<Arc<DomElementNode>> = (0..raw.len())
            .filter(|j| raw[*j].parent_index == i as i64)
            .filter_map(|j| built[j].take())
            .collect();

        let (top, in_viewport, visible) = match node.bounds {
            Some((x, y, w, h)) => {
                let visible = w > 0.0 && h > 0.0;
                let in_viewport =
                    visible && y < viewport_height && (y + h) > 0.0 && x < viewport_width;
                (y, in_viewport, visible)
            }
            None => (0.0, false, false),
        };

        let interactive = is_interactive(&node.node_name, &node.attributes);
        let highlight_index = if interactive && visible && in_viewport {
            let idx = highlight_counter;
            highlight_counter += 1;
            Some(idx)
        } else {
            None
        };

        let element = DomElementNode {
            tag: node.node_name.clone(),
            xpath: xpath_for(&raw, i),
            attributes: node.attributes.clone(),
            visible,
            in_viewport,
            top,
            interactive,
            highlight_index,
            text: node.text.clone(),
            parent: None,
            children,
        };
        built[i] = Some(Arc::new(element));
    }

    // Root is whichever node has no parent; CDP snapshots are single-rooted
    // per document.
    (0..raw.len())
        .find(|i| raw[*i].parent_index < 0)
        .and_then(|root_idx| built[root_idx].take())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> DomSnapshotResult {
        DomSnapshotResult {
            strings: vec![
                "html".into(),
                "body".into(),
                "button".into(),
                "type".into(),
                "submit".into(),
            ],
            documents: vec![json!({
                "nodes": {
                    "nodeName": [0, 1, 2],
                    "backendNodeId": [1, 2, 3],
                    "parentIndex": [-1, 0, 1],
                    "attributes": [[], [], [3, 4]],
                },
                "layout": {
                    "nodeIndex": [0, 1, 2],
                    "bounds": [[0.0, 0.0, 800.0, 600.0], [0.0, 0.0, 800.0, 600.0], [10.0, 10.0, 80.0, 20.0]],
                }
            })],
            raw: json!({}),
        }
    }

    #[test]
    fn assigns_highlight_index_to_interactive_visible_nodes() {
        let tree = build_tree(&sample(), 1280.0, 720.0).expect("tree");
        assert_eq!(tree.tag, "html");
        let body = &tree.children[0];
        let button = &body.children[0];
        assert_eq!(button.tag, "button");
        assert_eq!(button.highlight_index, Some(0));
        assert!(tree.highlight_index.is_none());
    }
}
