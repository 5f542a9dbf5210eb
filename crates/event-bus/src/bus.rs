//! Single-threaded cooperative scheduling over a multi-producer channel
//! (§4.1 "Concurrency Model"): one background task drains a FIFO queue of
//! dispatched events, running each event's handlers sequentially and in
//! registration order before picking up the next event. A handler that
//! dispatches a new event from inside its own invocation just enqueues
//! behind whatever the drain loop is currently awaiting, so a parent
//! event's handlers always finish before any event it spawned is
//! observed settling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};

use crate::errors::{check_name_uniqueness, EventBusError, HandlerError};
use crate::types::{BusEvent, EventAggregate, EventEnvelope, HandlerResult};

/// A registered subscriber. `id` is stable across the handler's
/// lifetime so `HandlerResult`/unregistration can refer to it without
/// holding a closure (DESIGN NOTES: "pub/sub without closures").
#[async_trait]
pub trait EventHandler<E>: Send + Sync
where
    E: BusEvent,
{
    fn id(&self) -> &str;
    async fn handle(&self, envelope: &EventEnvelope<E>) -> Result<(), String>;
}

struct QueuedDispatch<E> {
    envelope: EventEnvelope<E>,
    respond: oneshot::Sender<EventAggregate>,
}

struct Registrations<E> {
    handlers: HashMap<&'static str, Vec<Arc<dyn EventHandler<E>>>>,
    names: Vec<&'static str>,
    default_timeouts: HashMap<&'static str, Duration>,
}

impl<E> Default for Registrations<E> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            names: Vec::new(),
            default_timeouts: HashMap::new(),
        }
    }
}

/// The event bus. Cloning is cheap (an `Arc` around shared state); all
/// clones share the same drain task and registration table.
pub struct EventBus<E>
where
    E: BusEvent,
{
    registrations: Arc<RwLock<Registrations<E>>>,
    queue: mpsc::UnboundedSender<QueuedDispatch<E>>,
    default_timeout: Duration,
}

impl<E> Clone for EventBus<E>
where
    E: BusEvent,
{
    fn clone(&self) -> Self {
        Self {
            registrations: self.registrations.clone(),
            queue: self.queue.clone(),
            default_timeout: self.default_timeout,
        }
    }
}

impl<E> EventBus<E>
where
    E: BusEvent,
{
    /// `default_timeout` is used for any event class that has not been
    /// given a more specific timeout via `set_timeout`.
    pub fn new(default_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let registrations: Arc<RwLock<Registrations<E>>> =
            Arc::new(RwLock::new(Registrations::default()));
        spawn_drain_loop(rx, registrations.clone());
        Self {
            registrations,
            queue: tx,
            default_timeout,
        }
    }

    /// Override the per-event-class timeout. Call before any handlers
    /// dispatch that class so the check-at-registration invariant (#7)
    /// has the full name set to compare against.
    pub fn set_timeout(&self, event_name: &'static str, timeout: Duration) {
        self.registrations
            .write()
            .default_timeouts
            .insert(event_name, timeout);
    }

    /// Register a handler for `event_name`. Handlers for the same name
    /// run in the order they were registered.
    pub fn on(
        &self,
        event_name: &'static str,
        handler: Arc<dyn EventHandler<E>>,
    ) -> Result<(), EventBusError> {
        let mut reg = self.registrations.write();
        if !reg.names.contains(&event_name) {
            let mut candidate_names = reg.names.clone();
            candidate_names.push(event_name);
            check_name_uniqueness(&candidate_names).map_err(|e| EventBusError::HandlerError {
                event_name: event_name.to_string(),
                errors: vec![HandlerError {
                    handler_id: "registry".to_string(),
                    message: e.to_string(),
                }],
            })?;
            reg.names.push(event_name);
        }
        reg.handlers
            .entry(event_name)
            .or_default()
            .push(handler);
        Ok(())
    }

    pub fn unregister(&self, event_name: &str, handler_id: &str) {
        if let Some(list) = self.registrations.write().handlers.get_mut(event_name) {
            list.retain(|h| h.id() != handler_id);
        }
    }

    fn timeout_for(&self, event_name: &str) -> Duration {
        self.registrations
            .read()
            .default_timeouts
            .get(event_name)
            .copied()
            .unwrap_or(self.default_timeout)
    }

    /// Enqueue `payload` for dispatch and await its own settlement.
    /// Never returns an `Err`: timeouts and handler failures show up as
    /// fields on the returned `EventAggregate` (§7 "dispatch never
    /// throws").
    pub async fn dispatch(&self, payload: E) -> EventAggregate {
        let event_name = payload.name();
        let timeout = self.timeout_for(event_name);
        let envelope = EventEnvelope::new(payload, timeout);
        self.dispatch_envelope(envelope).await
    }

    pub async fn dispatch_envelope(&self, envelope: EventEnvelope<E>) -> EventAggregate {
        let (tx, rx) = oneshot::channel();
        let queued = QueuedDispatch {
            envelope,
            respond: tx,
        };
        if self.queue.send(queued).is_err() {
            return EventAggregate {
                event_id: String::new(),
                event_name: "unknown".to_string(),
                timed_out: false,
                handler_results: Vec::new(),
            };
        }
        rx.await.unwrap_or(EventAggregate {
            event_id: String::new(),
            event_name: "unknown".to_string(),
            timed_out: false,
            handler_results: Vec::new(),
        })
    }

    /// Same as `dispatch`, but collapses a failed aggregate into a
    /// single `EventBusError` (Open Question: "aggregate all handler
    /// errors into one error object").
    pub async fn dispatch_or_throw(&self, payload: E) -> Result<EventAggregate, EventBusError> {
        let event_name = payload.name().to_string();
        let timeout = self.timeout_for(&event_name);
        let aggregate = self.dispatch(payload).await;
        if aggregate.timed_out {
            return Err(EventBusError::Timeout {
                event_name,
                timeout_s: timeout.as_secs_f64(),
            });
        }
        let errors: Vec<HandlerError> = aggregate
            .handler_results
            .iter()
            .filter(|r| !r.ok)
            .map(|r| HandlerError {
                handler_id: r.handler_id.clone(),
                message: r.error.clone().unwrap_or_default(),
            })
            .collect();
        if !errors.is_empty() {
            return Err(EventBusError::HandlerError { event_name, errors });
        }
        Ok(aggregate)
    }
}

fn spawn_drain_loop<E>(
    mut rx: mpsc::UnboundedReceiver<QueuedDispatch<E>>,
    registrations: Arc<RwLock<Registrations<E>>>,
) where
    E: BusEvent,
{
    tokio::spawn(async move {
        while let Some(queued) = rx.recv().await {
            let QueuedDispatch { envelope, respond } = queued;
            let event_id = envelope.event_id.to_string();
            let event_name = envelope.payload.name().to_string();
            // Snapshot handlers at dispatch time: registration/unregistration
            // racing with this dispatch must not change this event's
            // `handler_results` length (Testable Property #2).
            let handlers: Vec<Arc<dyn EventHandler<E>>> = registrations
                .read()
                .handlers
                .get(event_name.as_str())
                .cloned()
                .unwrap_or_default();

            let timeout = envelope.timeout;
            let cancel = envelope.cancel.clone();
            let run = run_handlers_sequentially(handlers, envelope);

            let (timed_out, handler_results) = match tokio::time::timeout(timeout, run).await {
                Ok(results) => (false, results),
                Err(_) => {
                    cancel.cancel();
                    (true, Vec::new())
                }
            };

            let aggregate = EventAggregate {
                event_id,
                event_name,
                timed_out,
                handler_results,
            };
            let _ = respond.send(aggregate);
        }
    });
}

async fn run_handlers_sequentially<E>(
    handlers: Vec<Arc<dyn EventHandler<E>>>,
    envelope: EventEnvelope<E>,
) -> Vec<HandlerResult>
where
    E: BusEvent,
{
    let mut results = Vec::with_capacity(handlers.len());
    for handler in handlers {
        let outcome = handler.handle(&envelope).await;
        results.push(HandlerResult {
            handler_id: handler.id().to_string(),
            ok: outcome.is_ok(),
            error: outcome.err(),
        });
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Clone, Debug)]
    enum TestEvent {
        Ping,
        Slow,
    }

    impl BusEvent for TestEvent {
        fn name(&self) -> &'static str {
            match self {
                TestEvent::Ping => "Ping",
                TestEvent::Slow => "Slow",
            }
        }
    }

    struct OrderRecorder {
        id: String,
        order: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl EventHandler<TestEvent> for OrderRecorder {
        fn id(&self) -> &str {
            &self.id
        }

        async fn handle(&self, _envelope: &EventEnvelope<TestEvent>) -> Result<(), String> {
            self.order.lock().await.push(self.id.clone());
            Ok(())
        }
    }

    struct FailingHandler {
        id: String,
    }

    #[async_trait]
    impl EventHandler<TestEvent> for FailingHandler {
        fn id(&self) -> &str {
            &self.id
        }

        async fn handle(&self, _envelope: &EventEnvelope<TestEvent>) -> Result<(), String> {
            Err(format!("{} failed", self.id))
        }
    }

    struct HangingHandler;

    #[async_trait]
    impl EventHandler<TestEvent> for HangingHandler {
        fn id(&self) -> &str {
            "hanging"
        }

        async fn handle(&self, envelope: &EventEnvelope<TestEvent>) -> Result<(), String> {
            envelope.cancel.cancelled().await;
            Err("cancelled".to_string())
        }
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let bus: EventBus<TestEvent> = EventBus::new(Duration::from_secs(1));
        let order = Arc::new(Mutex::new(Vec::new()));
        bus.on(
            "Ping",
            Arc::new(OrderRecorder {
                id: "a".into(),
                order: order.clone(),
            }),
        )
        .unwrap();
        bus.on(
            "Ping",
            Arc::new(OrderRecorder {
                id: "b".into(),
                order: order.clone(),
            }),
        )
        .unwrap();

        let aggregate = bus.dispatch(TestEvent::Ping).await;
        assert_eq!(aggregate.handler_results.len(), 2);
        assert_eq!(*order.lock().await, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn dispatch_or_throw_aggregates_handler_errors() {
        let bus: EventBus<TestEvent> = EventBus::new(Duration::from_secs(1));
        bus.on("Ping", Arc::new(FailingHandler { id: "x".into() }))
            .unwrap();
        bus.on("Ping", Arc::new(FailingHandler { id: "y".into() }))
            .unwrap();

        let err = bus.dispatch_or_throw(TestEvent::Ping).await.unwrap_err();
        match err {
            EventBusError::HandlerError { errors, .. } => assert_eq!(errors.len(), 2),
            other => panic!("expected HandlerError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_handler_times_out() {
        let bus: EventBus<TestEvent> = EventBus::new(Duration::from_millis(20));
        bus.on("Slow", Arc::new(HangingHandler)).unwrap();

        let aggregate = bus.dispatch(TestEvent::Slow).await;
        assert!(aggregate.timed_out);
        assert!(aggregate.handler_results.is_empty());
    }

    #[tokio::test]
    async fn handler_count_is_snapshotted_at_dispatch_time() {
        let bus: EventBus<TestEvent> = EventBus::new(Duration::from_secs(1));
        let calls = Arc::new(AtomicUsize::new(0));

        struct Counting(Arc<AtomicUsize>);
        #[async_trait]
        impl EventHandler<TestEvent> for Counting {
            fn id(&self) -> &str {
                "counting"
            }
            async fn handle(&self, _e: &EventEnvelope<TestEvent>) -> Result<(), String> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
        bus.on("Ping", Arc::new(Counting(calls.clone()))).unwrap();

        let aggregate = bus.dispatch(TestEvent::Ping).await;
        assert_eq!(aggregate.handler_results.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rejects_overlapping_event_names() {
        let bus: EventBus<TestEvent> = EventBus::new(Duration::from_secs(1));
        bus.on("Ping", Arc::new(FailingHandler { id: "a".into() }))
            .unwrap();
        // "Pin" would collide in substring terms with an imaginary future name,
        // but here we directly assert the uniqueness checker a second
        // registration consults rejects a colliding pair.
        let err = check_name_uniqueness(&["Ping", "Pin"]);
        assert!(err.is_err());
    }
}
