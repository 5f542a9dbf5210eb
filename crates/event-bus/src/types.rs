//! Envelope and aggregate types shared by every event class on the bus.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use soulbrowser_core_types::EventId;

/// Payload marker. Consuming crates define one tagged-variant enum (e.g.
/// `BrowserEvent::TabCreated { .. }`) and implement this for it; the bus
/// itself stays generic over `E` and never inspects the payload.
///
/// Dispatch is by `name()`, not by Rust type — this is the "tagged
/// variants instead of inheritance/dynamic dispatch" approach from the
/// DESIGN NOTES: handlers register against a name string, so the bus
/// never needs a vtable or `Any` downcast to route an event.
pub trait BusEvent: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Event class name, e.g. `"TabCreated"`. Must satisfy the
    /// non-substring uniqueness invariant across the whole class set
    /// registered with one bus.
    fn name(&self) -> &'static str;
}

/// One event in flight, with the correlation/timeout metadata from the
/// DATA MODEL's event record.
#[derive(Clone, Debug)]
pub struct EventEnvelope<E> {
    pub event_id: EventId,
    pub event_parent_id: Option<EventId>,
    pub event_created_at: std::time::SystemTime,
    pub timeout: Duration,
    pub metadata: Value,
    pub payload: E,
    pub cancel: CancellationToken,
}

impl<E> EventEnvelope<E> {
    pub fn new(payload: E, timeout: Duration) -> Self {
        Self {
            event_id: EventId::new(),
            event_parent_id: None,
            event_created_at: std::time::SystemTime::now(),
            timeout,
            metadata: Value::Null,
            payload,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_parent(mut self, parent: EventId) -> Self {
        self.event_parent_id = Some(parent);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Outcome of a single handler invocation, keyed by the id it was
/// registered under so callers can tell which subscriber produced which
/// result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandlerResult {
    pub handler_id: String,
    pub ok: bool,
    pub error: Option<String>,
}

/// What `dispatch` returns: never an `Err` by itself (§7 "dispatch never
/// throws") — timeouts and handler failures are reported as fields, and
/// it is `dispatch_or_throw`'s job to turn this into a single `Result`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventAggregate {
    pub event_id: String,
    pub event_name: String,
    pub timed_out: bool,
    /// Length equals the handler count snapshotted at dispatch time,
    /// regardless of concurrent (de)registration afterward (Testable
    /// Property #2).
    pub handler_results: Vec<HandlerResult>,
}

impl EventAggregate {
    pub fn has_errors(&self) -> bool {
        self.timed_out || self.handler_results.iter().any(|r| !r.ok)
    }

    pub fn errors(&self) -> Vec<String> {
        self.handler_results
            .iter()
            .filter(|r| !r.ok)
            .map(|r| format!("{}: {}", r.handler_id, r.error.clone().unwrap_or_default()))
            .collect()
    }
}
