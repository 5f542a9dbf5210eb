//! Append-only event log that backs `l6-timeline`'s read path and
//! `telemetry`'s captured-event export. Events are written once,
//! never mutated, and read back by action/session/task scope or time
//! range; retention is a ring buffer so long runs don't grow unbounded.

pub mod model;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;

use model::{ArtifactRef, EventEnvelope, Filter, ReadHandle, ReplayBundle};

#[derive(Debug, Error, Clone)]
pub enum EsError {
    #[error("event store capacity exhausted")]
    CapacityExhausted,
    #[error("event store io failure: {0}")]
    Io(String),
}

/// Port implemented by whatever backs durable event storage (in
/// memory for tests/single-node, or a real log store in production).
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, envelope: EventEnvelope) -> Result<(), EsError>;
    async fn tail(&self, limit: usize, filter: Option<Filter>) -> Result<Vec<EventEnvelope>, EsError>;
    async fn by_action(&self, action_id: &str) -> Result<Vec<EventEnvelope>, EsError>;
    async fn export_range(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<ReadHandle, EsError>;
    async fn replay_minimal(&self, action_id: &str) -> Result<ReplayBundle, EsError>;
}

struct TimestampedEnvelope {
    envelope: EventEnvelope,
    at: DateTime<Utc>,
}

/// Ring-buffer backed store. Default capacity keeps a generous recent
/// window without unbounded growth across a long-lived agent process.
pub struct InMemoryEventStore {
    capacity: usize,
    events: Mutex<VecDeque<TimestampedEnvelope>>,
    clock_base: Instant,
    seq: AtomicU64,
}

impl InMemoryEventStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            clock_base: Instant::now(),
            seq: AtomicU64::new(0),
        }
    }

    /// Monotonic nanosecond timestamp relative to store creation;
    /// strictly increasing even under clock adjustments.
    pub fn next_ts_mono(&self) -> u128 {
        let elapsed = self.clock_base.elapsed().as_nanos();
        let tie_break = self.seq.fetch_add(1, Ordering::Relaxed) as u128;
        elapsed + tie_break
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new(65_536)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, envelope: EventEnvelope) -> Result<(), EsError> {
        let mut events = self.events.lock();
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(TimestampedEnvelope {
            envelope,
            at: Utc::now(),
        });
        Ok(())
    }

    async fn tail(&self, limit: usize, filter: Option<Filter>) -> Result<Vec<EventEnvelope>, EsError> {
        let events = self.events.lock();
        let matched: Vec<EventEnvelope> = events
            .iter()
            .rev()
            .filter(|e| filter.as_ref().map(|f| f.matches(&e.envelope)).unwrap_or(true))
            .take(limit)
            .map(|e| e.envelope.clone())
            .collect();
        Ok(matched.into_iter().rev().collect())
    }

    async fn by_action(&self, action_id: &str) -> Result<Vec<EventEnvelope>, EsError> {
        let events = self.events.lock();
        Ok(events
            .iter()
            .filter(|e| {
                e.envelope
                    .scope
                    .action
                    .as_ref()
                    .map(|id| id.0 == action_id)
                    .unwrap_or(false)
            })
            .map(|e| e.envelope.clone())
            .collect())
    }

    async fn export_range(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<ReadHandle, EsError> {
        let events = self.events.lock();
        let total = events.len();
        let matched: Vec<EventEnvelope> = events
            .iter()
            .filter(|e| e.at >= since && e.at <= until)
            .map(|e| e.envelope.clone())
            .collect();
        Ok(ReadHandle {
            truncated: total >= self.capacity,
            events: matched,
        })
    }

    async fn replay_minimal(&self, action_id: &str) -> Result<ReplayBundle, EsError> {
        let matched = self.by_action(action_id).await?;
        if matched.is_empty() {
            return Ok(ReplayBundle::default());
        }
        let evidence: Vec<ArtifactRef> = matched
            .iter()
            .filter_map(|e| e.payload.get("artifact").and_then(|a| a.as_object()))
            .filter_map(|obj| {
                let kind = obj.get("kind")?.as_str()?.to_string();
                let id = obj.get("id")?.as_str()?.to_string();
                Some(ArtifactRef { kind, id })
            })
            .collect();
        Ok(ReplayBundle {
            action: matched[0].scope.action.clone(),
            timeline: matched.iter().map(|e| e.payload.clone()).collect(),
            evidence,
            summary: Some(format!("{} events replayed for action {action_id}", matched.len())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::EventScope;
    use soulbrowser_core_types::ActionId;

    fn envelope(action: &str, kind: &str) -> EventEnvelope {
        EventEnvelope {
            scope: EventScope {
                action: Some(ActionId(action.to_string())),
                ..Default::default()
            },
            kind: kind.to_string(),
            ts_mono: 0,
            payload: serde_json::json!({"action": action}),
        }
    }

    #[tokio::test]
    async fn ring_buffer_evicts_oldest_past_capacity() {
        let store = InMemoryEventStore::new(2);
        store.append(envelope("a1", "click")).await.unwrap();
        store.append(envelope("a2", "click")).await.unwrap();
        store.append(envelope("a3", "click")).await.unwrap();
        let tail = store.tail(10, None).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert!(tail.iter().all(|e| e.scope.action.as_ref().unwrap().0 != "a1"));
    }

    #[tokio::test]
    async fn by_action_filters_to_matching_scope() {
        let store = InMemoryEventStore::new(16);
        store.append(envelope("a1", "click")).await.unwrap();
        store.append(envelope("a2", "type")).await.unwrap();
        let matched = store.by_action("a2").await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].kind, "type");
    }

    #[tokio::test]
    async fn replay_minimal_empty_for_unknown_action() {
        let store = InMemoryEventStore::new(16);
        let bundle = store.replay_minimal("missing").await.unwrap();
        assert!(bundle.timeline.is_empty());
        assert!(bundle.summary.is_none());
    }
}
