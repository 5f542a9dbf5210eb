//! Wire types for the append-only event log.

use serde::{Deserialize, Serialize};
use soulbrowser_core_types::{ActionId, PageId, SessionId, TaskId};

/// Correlation keys carried by every stored event. Mirrors the bus
/// event's `event_parent_id`/task linkage so the timeline reader can
/// slice by action, flow (session), or task without a join.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventScope {
    pub session: Option<SessionId>,
    pub page: Option<PageId>,
    pub task: Option<TaskId>,
    pub action: Option<ActionId>,
}

/// One durable event record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub scope: EventScope,
    pub kind: String,
    /// Monotonic timestamp in nanoseconds since the store was opened.
    pub ts_mono: u128,
    pub payload: serde_json::Value,
}

/// Query filter for `EventStore::tail`.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub scope: Option<EventScope>,
    pub kinds: Option<Vec<String>>,
}

impl Filter {
    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.iter().any(|k| k == &envelope.kind) {
                return false;
            }
        }
        if let Some(scope) = &self.scope {
            if scope.session.is_some() && scope.session != envelope.scope.session {
                return false;
            }
            if scope.task.is_some() && scope.task != envelope.scope.task {
                return false;
            }
            if scope.action.is_some() && scope.action != envelope.scope.action {
                return false;
            }
        }
        true
    }
}

/// Reference to a side-channel artifact (screenshot pixel diff, DOM
/// structural snapshot) produced alongside an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub kind: String,
    pub id: String,
}

/// Result of a range export: the matched events plus how many were
/// dropped by the store's retention policy (never silently implied).
#[derive(Debug, Clone, Default)]
pub struct ReadHandle {
    pub events: Vec<EventEnvelope>,
    pub truncated: bool,
}

/// Minimal replay bundle for one action: its event timeline plus any
/// artifacts collected for it.
#[derive(Debug, Clone, Default)]
pub struct ReplayBundle {
    pub action: Option<ActionId>,
    pub timeline: Vec<serde_json::Value>,
    pub evidence: Vec<ArtifactRef>,
    pub summary: Option<String>,
}
