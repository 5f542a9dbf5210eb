//! Live-perception interface consumed by `action-locator`'s fallback
//! resolution strategies (CSS / ARIA / text) and self-healing. Distinct
//! from `DomState`/`find_in_tree` (§4.2's offline snapshot identity): a
//! `StructuralPerceiver` answers "what matches this anchor *right now*"
//! against a session's live element tree, so it is route-scoped rather
//! than snapshot-scoped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use soulbrowser_core_types::ExecRoute;

use crate::errors::DomModelError;

/// Anchor hint passed to a resolution strategy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ResolveHint {
    Css(String),
    Aria { role: String, name: Option<String> },
    Text { pattern: String },
}

/// Tuning knobs for a single `resolve_anchor` call.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResolveOptions {
    pub max_candidates: usize,
    pub fuzziness: Option<f32>,
    pub debounce_ms: Option<u64>,
}

/// Element bounding box in CSS pixels, as reported by the live tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One candidate element surfaced by a `StructuralPerceiver` query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnchorDescriptor {
    pub strategy: String,
    pub confidence: f32,
    pub backend_node_id: Option<i64>,
    pub geometry: Option<Geometry>,
    /// Free-form attribute bag (tagName, text, ariaRole, ariaLabel, domIndex, visible, enabled).
    pub value: serde_json::Value,
}

/// Result of a single anchor resolution: a primary best guess plus
/// the runner-up candidates the caller may fall back to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnchorResolution {
    pub primary: AnchorDescriptor,
    #[serde(default)]
    pub candidates: Vec<AnchorDescriptor>,
}

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error, Clone)]
    pub enum PerceiverError {
        #[error("no element matched the anchor hint")]
        NoMatch,
        #[error("live perception unavailable for route: {0}")]
        RouteUnavailable(String),
        #[error("perceiver io failure: {0}")]
        Io(String),
    }
}

use errors::PerceiverError;

/// Queries a route's live DOM for elements matching an anchor hint.
/// Implementations back this with a fresh CDP/accessibility-tree read
/// (or, in tests, a canned `DomState`); the trait itself is transport
/// agnostic, matching the DESIGN NOTES "duck-typed driver" approach.
#[async_trait]
pub trait StructuralPerceiver: Send + Sync {
    async fn resolve_anchor(
        &self,
        route: ExecRoute,
        hint: ResolveHint,
        options: ResolveOptions,
    ) -> Result<AnchorResolution, PerceiverError>;
}

impl From<PerceiverError> for DomModelError {
    fn from(err: PerceiverError) -> Self {
        DomModelError::Perception(err.to_string())
    }
}
