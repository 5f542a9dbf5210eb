//! Crash Watchdog (§4.4): per-page crash detection plus a health timer
//! that (a) flags requests older than `network_timeout_ms` and (b)
//! polls `document.readyState`, escalating to `TargetUnresponsive` after
//! `unresponsive_threshold` consecutive poll failures.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use browser_session::{BrowserEvent, BrowserErrorKind, BrowserSession};
use cdp_adapter::events::{EventFilter, NetworkSignal, RawEvent};
use parking_lot::Mutex;
use soulbrowser_event_bus::{EventEnvelope, EventHandler};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::pending_requests::PendingRequestTracker;

#[derive(Clone, Debug)]
pub struct CrashConfig {
    pub poll_interval: Duration,
    pub network_timeout_ms: u64,
    pub unresponsive_threshold: u32,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            network_timeout_ms: 30_000,
            unresponsive_threshold: 3,
        }
    }
}

struct Tasks {
    raw_event_bridge: Option<JoinHandle<()>>,
    health_timer: Option<JoinHandle<()>>,
}

/// `Clone`-cheap: the watchdog itself is a thin handle around shared
/// state, so the object registered on the bus and the task spawned on
/// `BrowserConnected` can both reach the same tracker and counters.
#[derive(Clone)]
pub struct CrashWatchdog {
    session: Arc<BrowserSession>,
    config: CrashConfig,
    tracker: Arc<PendingRequestTracker>,
    request_counter: Arc<AtomicU64>,
    consecutive_failures: Arc<AtomicU32>,
    tasks: Arc<Mutex<Tasks>>,
}

impl CrashWatchdog {
    pub fn new(session: Arc<BrowserSession>, config: CrashConfig) -> Self {
        Self {
            session,
            config,
            tracker: Arc::new(PendingRequestTracker::default()),
            request_counter: Arc::new(AtomicU64::new(0)),
            consecutive_failures: Arc::new(AtomicU32::new(0)),
            tasks: Arc::new(Mutex::new(Tasks {
                raw_event_bridge: None,
                health_timer: None,
            })),
        }
    }

    pub fn tracker(&self) -> Arc<PendingRequestTracker> {
        Arc::clone(&self.tracker)
    }

    fn attach(&self) {
        let mut tasks = self.tasks.lock();
        if tasks.raw_event_bridge.is_some() {
            return;
        }

        let adapter = self.session.adapter();
        let mut raw_rx = adapter.subscribe(EventFilter);
        let tracker = Arc::clone(&self.tracker);
        let request_counter = Arc::clone(&self.request_counter);
        let bus = self.session.bus().clone();

        tasks.raw_event_bridge = Some(tokio::spawn(async move {
            loop {
                match raw_rx.recv().await {
                    Ok(RawEvent::NetworkActivity { signal, .. }) => match signal {
                        NetworkSignal::RequestWillBeSent => {
                            let id = request_counter.fetch_add(1, Ordering::SeqCst);
                            tracker.start(id, String::new(), "GET".to_string());
                        }
                        NetworkSignal::ResponseReceived { .. }
                        | NetworkSignal::LoadingFinished
                        | NetworkSignal::LoadingFailed => {
                            // The adapter's `NetworkActivity` signal carries no
                            // request id yet; a full request/response pairing
                            // will need that id threaded through the raw
                            // event, tracked as a follow-up on the adapter
                            // side. Until then this clears the oldest entry.
                            if let Some(oldest) = tracker.requests_older_than(0).first() {
                                tracker.finish(oldest.0);
                            }
                        }
                    },
                    Ok(RawEvent::Error { message, .. }) => {
                        warn!(%message, "adapter reported a page error; treating as crash");
                        bus.dispatch(BrowserEvent::TargetCrashed {
                            target_id: "unknown".to_string(),
                        })
                        .await;
                        bus.dispatch(BrowserEvent::BrowserError {
                            kind: BrowserErrorKind::TargetCrash,
                            message,
                            details: serde_json::Value::Null,
                        })
                        .await;
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        }));

        let session = Arc::clone(&self.session);
        let config = self.config.clone();
        let tracker = Arc::clone(&self.tracker);
        let consecutive_failures = Arc::clone(&self.consecutive_failures);
        let bus = self.session.bus().clone();

        tasks.health_timer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.poll_interval);
            loop {
                interval.tick().await;

                for (_, url) in tracker.requests_older_than(config.network_timeout_ms) {
                    bus.dispatch(BrowserEvent::BrowserError {
                        kind: BrowserErrorKind::NetworkTimeout,
                        message: format!("request to {url} exceeded {}ms", config.network_timeout_ms),
                        details: serde_json::Value::Null,
                    })
                    .await;
                }

                let Ok(page) = session.current_adapter_page() else {
                    continue;
                };
                let adapter = session.adapter();
                let ready = tokio::time::timeout(
                    Duration::from_secs(3),
                    adapter.evaluate_script(page, "document.readyState"),
                )
                .await;

                match ready {
                    Ok(Ok(_)) => consecutive_failures.store(0, Ordering::SeqCst),
                    _ => {
                        let failures = consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                        if failures >= config.unresponsive_threshold {
                            bus.dispatch(BrowserEvent::TargetUnresponsive {
                                target_id: session
                                    .current_tab()
                                    .map(|t| t.target_id)
                                    .unwrap_or_default(),
                                consecutive_failures: failures,
                            })
                            .await;
                        }
                    }
                }
            }
        }));
    }

    fn detach(&self) {
        let mut tasks = self.tasks.lock();
        if let Some(handle) = tasks.raw_event_bridge.take() {
            handle.abort();
        }
        if let Some(handle) = tasks.health_timer.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl EventHandler<BrowserEvent> for CrashWatchdog {
    fn id(&self) -> &str {
        "crash-watchdog"
    }

    async fn handle(&self, envelope: &EventEnvelope<BrowserEvent>) -> Result<(), String> {
        match &envelope.payload {
            BrowserEvent::BrowserConnected => self.attach(),
            BrowserEvent::BrowserStopped => self.detach(),
            _ => {}
        }
        Ok(())
    }
}
