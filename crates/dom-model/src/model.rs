//! DOM element tree and the two fingerprints (exact/stable) used to
//! re-identify elements across snapshots.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

/// One node in a DOM snapshot's element tree.
///
/// `parent` is a weak reference so the tree (owned top-down via
/// `children`) and the upward walk needed for `xpath`/hashing never form
/// an `Arc` cycle — see DESIGN NOTES "Cyclic DOM references".
#[derive(Clone, Debug, Default)]
pub struct DomElementNode {
    pub tag: String,
    pub xpath: String,
    pub attributes: BTreeMap<String, String>,
    pub visible: bool,
    pub in_viewport: bool,
    pub top: f64,
    pub interactive: bool,
    pub highlight_index: Option<u32>,
    pub text: String,
    pub parent: Option<Weak<DomElementNode>>,
    pub children: Vec<Arc<DomElementNode>>,
}

/// Snapshot-local mapping from highlight index to element. Indices are
/// contiguous and unique per snapshot (§3 invariant).
#[derive(Clone, Debug, Default)]
pub struct DomState {
    pub root: Option<Arc<DomElementNode>>,
    pub selector_map: HashMap<u32, Arc<DomElementNode>>,
}

impl DomState {
    pub fn get(&self, highlight_index: u32) -> Option<&Arc<DomElementNode>> {
        self.selector_map.get(&highlight_index)
    }

    /// Invariant check: highlight indices are contiguous starting at 0.
    pub fn indices_are_contiguous(&self) -> bool {
        let mut indices: Vec<u32> = self.selector_map.keys().copied().collect();
        indices.sort_unstable();
        indices.iter().enumerate().all(|(i, v)| i as u32 == *v)
    }
}

/// Attribute name fragments considered "dynamic" for the stable hash.
/// Resolves spec.md §9's Open Question with the spec's own conservative
/// default: class tokens that flip on interaction state, plus
/// auto-generated id prefixes.
#[derive(Clone, Debug)]
pub struct DynamicAttributePolicy {
    pub dynamic_class_tokens: Vec<String>,
    pub autogenerated_id_prefixes: Vec<String>,
}

impl Default for DynamicAttributePolicy {
    fn default() -> Self {
        Self {
            dynamic_class_tokens: vec![
                "focus".into(),
                "active".into(),
                "hover".into(),
                "selected".into(),
                "expanded".into(),
            ],
            autogenerated_id_prefixes: vec!["ember".into(), "id-".into()],
        }
    }
}

impl DynamicAttributePolicy {
    fn strip_class(&self, value: &str) -> String {
        value
            .split_whitespace()
            .filter(|tok| !self.dynamic_class_tokens.iter().any(|d| d == tok))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn is_autogenerated_id(&self, value: &str) -> bool {
        self.autogenerated_id_prefixes
            .iter()
            .any(|prefix| value.starts_with(prefix.as_str()))
    }

    /// Produce the attribute view used for the stable hash: dynamic class
    /// tokens removed, autogenerated ids dropped entirely.
    fn stable_attributes(&self, node: &DomElementNode) -> BTreeMap<String, String> {
        node.attributes
            .iter()
            .filter_map(|(k, v)| {
                if k == "id" && self.is_autogenerated_id(v) {
                    return None;
                }
                if k == "class" {
                    let stripped = self.strip_class(v);
                    if stripped.is_empty() {
                        return None;
                    }
                    return Some((k.clone(), stripped));
                }
                Some((k.clone(), v.clone()))
            })
            .collect()
    }
}

fn branch_path(node: &DomElementNode) -> String {
    let mut segments = Vec::new();
    let mut current_tag = node.tag.clone();
    let mut cursor: Option<Arc<DomElementNode>> =
        node.parent.as_ref().and_then(|weak| weak.upgrade());
    segments.push(current_tag.clone());
    while let Some(parent) = cursor {
        current_tag = parent.tag.clone();
        segments.push(current_tag.clone());
        cursor = parent.parent.as_ref().and_then(|weak| weak.upgrade());
    }
    segments.reverse();
    segments.join("/")
}

/// Fingerprint identity: branch-path + sorted attributes + xpath. Pure
/// function of the node's own fields and its ancestor tags — never
/// follows `parent` beyond reading the tag (DESIGN NOTES: "Hash
/// computation must not follow parent during traversal" beyond that).
pub fn exact_hash(node: &DomElementNode) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    branch_path(node).hash(&mut hasher);
    node.xpath.hash(&mut hasher);
    for (k, v) in &node.attributes {
        k.hash(&mut hasher);
        v.hash(&mut hasher);
    }
    hasher.finish()
}

/// Same identity, but dynamic/state-indicating attribute tokens are
/// removed first so cosmetic re-renders (a class flip from `focus` to
/// `active`) don't change the fingerprint.
pub fn stable_hash(node: &DomElementNode) -> u64 {
    stable_hash_with_policy(node, &DynamicAttributePolicy::default())
}

pub fn stable_hash_with_policy(node: &DomElementNode, policy: &DynamicAttributePolicy) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    branch_path(node).hash(&mut hasher);
    node.xpath.hash(&mut hasher);
    for (k, v) in policy.stable_attributes(node) {
        k.hash(&mut hasher);
        v.hash(&mut hasher);
    }
    hasher.finish()
}

/// Re-find a history element in a newer tree: exact hash first, then
/// stable hash. Returns the matching node from `new_state`, if any.
pub fn find_in_tree<'a>(
    history_element: &DomElementNode,
    new_state: &'a DomState,
) -> Option<&'a Arc<DomElementNode>> {
    let target_exact = exact_hash(history_element);
    if let Some(hit) = new_state
        .selector_map
        .values()
        .find(|n| exact_hash(n) == target_exact)
    {
        return Some(hit);
    }
    let target_stable = stable_hash(history_element);
    new_state
        .selector_map
        .values()
        .find(|n| stable_hash(n) == target_stable)
}

/// Wire-format element reference sent to the LLM / recorded in history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElementSelectorRef {
    pub highlight_index: u32,
    pub tag_name: String,
    pub css_selector: Option<String>,
    pub xpath: String,
    pub text_content: Option<String>,
    pub backend_node_id: Option<i64>,
}

impl ElementSelectorRef {
    pub fn from_node(node: &DomElementNode) -> Option<Self> {
        let idx = node.highlight_index?;
        Some(Self {
            highlight_index: idx,
            tag_name: node.tag.clone(),
            css_selector: None,
            xpath: node.xpath.clone(),
            text_content: if node.text.is_empty() {
                None
            } else {
                Some(node.text.chars().take(200).collect())
            },
            backend_node_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(tag: &str, xpath: &str, class: &str) -> Arc<DomElementNode> {
        let mut attrs = BTreeMap::new();
        attrs.insert("class".to_string(), class.to_string());
        Arc::new(DomElementNode {
            tag: tag.to_string(),
            xpath: xpath.to_string(),
            attributes: attrs,
            visible: true,
            in_viewport: true,
            top: 0.0,
            interactive: true,
            highlight_index: Some(0),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        })
    }

    #[test]
    fn exact_hash_is_pure_function_of_node() {
        let a = leaf("button", "/html/body/button", "btn focus");
        let b = leaf("button", "/html/body/button", "btn focus");
        assert_eq!(exact_hash(&a), exact_hash(&b));
    }

    #[test]
    fn stable_hash_survives_dynamic_class_flip() {
        let focus = leaf("button", "/html/body/button", "btn focus");
        let active = leaf("button", "/html/body/button", "btn active");
        assert_eq!(stable_hash(&focus), stable_hash(&active));
        assert_ne!(exact_hash(&focus), exact_hash(&active));
    }

    #[test]
    fn stable_hash_differs_on_real_attribute_change() {
        let a = leaf("button", "/html/body/button", "btn");
        let b = leaf("a", "/html/body/a", "btn");
        assert_ne!(stable_hash(&a), stable_hash(&b));
    }
}
