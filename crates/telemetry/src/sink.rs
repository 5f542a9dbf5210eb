//! Pluggable capture/flush sink (§4.8). Default is a no-op so the agent
//! loop never depends on a concrete telemetry backend.

use async_trait::async_trait;

use crate::event::AgentTelemetryEvent;

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn capture(&self, event: &AgentTelemetryEvent);
    async fn flush(&self);
}

/// Default sink: captures and flushes are both no-ops.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

#[async_trait]
impl TelemetrySink for NoopSink {
    async fn capture(&self, _event: &AgentTelemetryEvent) {}
    async fn flush(&self) {}
}

/// Sink that appends each event into the in-memory event store,
/// grounded on event-store's existing role as the telemetry read path.
pub struct EventStoreSink {
    store: event_store::InMemoryEventStore,
}

impl EventStoreSink {
    pub fn new(store: event_store::InMemoryEventStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TelemetrySink for EventStoreSink {
    async fn capture(&self, event: &AgentTelemetryEvent) {
        use event_store::EventStore as _;
        let envelope = event_store::model::EventEnvelope {
            scope: event_store::model::EventScope {
                session: None,
                page: None,
                task: Some(event.task_id.clone()),
                action: None,
            },
            kind: "agent_event".to_string(),
            ts_mono: self.store.next_ts_mono(),
            payload: serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
        };
        if let Err(err) = self.store.append(envelope).await {
            tracing::warn!(%err, "telemetry sink failed to append agent_event");
        }
    }

    async fn flush(&self) {}
}
