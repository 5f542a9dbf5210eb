//! DOM Model & Hashing (C2): a serializable DOM tree, stable element
//! fingerprints, and history matching, plus the derived views
//! (pagination controls, clickable-element rendering) the agent step
//! loop's message builder consumes.

#![allow(dead_code)]

pub mod errors;
pub mod model;
pub mod pagination;
pub mod perceiver;
pub mod render;

pub use errors::DomModelError;
pub use model::{
    exact_hash, find_in_tree, stable_hash, stable_hash_with_policy, DomElementNode, DomState,
    DynamicAttributePolicy, ElementSelectorRef,
};
pub use pagination::{detect_pagination_buttons, PaginationButton, PaginationButtonType};
pub use perceiver::{
    AnchorDescriptor, AnchorResolution, Geometry, ResolveHint, ResolveOptions, StructuralPerceiver,
};
pub use render::clickable_elements_to_string;
