//! CDP Session Watchdog (§4.4): owns a subscription to the adapter's
//! root event channel and diffs target lifecycle against its own
//! `target_id → url` map, emitting `TabCreated`/`TabClosed`/
//! `NavigationComplete` for targets the session didn't open itself (for
//! example a page-initiated popup via `window.open`).
//!
//! Grounded directly in `cdp_adapter::adapter::CdpAdapter`'s own
//! `emit_page_event` phase vocabulary: `"opened"` and `"closed"` are the
//! phases it publishes from `on_target_created`/`on_target_destroyed`.

use std::sync::Arc;

use async_trait::async_trait;
use browser_session::{BrowserEvent, BrowserSession, TabInfo};
use cdp_adapter::events::{EventFilter, RawEvent};
use cdp_adapter::ids::PageId;
use dashmap::DashMap;
use parking_lot::Mutex;
use soulbrowser_event_bus::{EventEnvelope, EventHandler};
use tokio::task::JoinHandle;

#[derive(Clone, Debug)]
struct TargetEntry {
    url: String,
}

pub struct CdpSessionWatchdog {
    session: Arc<BrowserSession>,
    targets: Arc<DashMap<PageId, TargetEntry>>,
    bridge: Mutex<Option<JoinHandle<()>>>,
}

impl CdpSessionWatchdog {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self {
            session,
            targets: Arc::new(DashMap::new()),
            bridge: Mutex::new(None),
        }
    }

    fn attach(&self) {
        let mut bridge = self.bridge.lock();
        if bridge.is_some() {
            return;
        }
        let adapter = self.session.adapter();
        let mut rx = adapter.subscribe(EventFilter);
        let targets = Arc::clone(&self.targets);
        let bus = self.session.bus().clone();

        *bridge = Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(RawEvent::PageLifecycle {
                        page, phase, opener, ..
                    }) => match phase.as_str() {
                        "opened" if opener.is_some() => {
                            targets.insert(
                                page,
                                TargetEntry {
                                    url: String::new(),
                                },
                            );
                            bus.dispatch(BrowserEvent::TabCreated {
                                tab: TabInfo {
                                    target_id: format!("{page:?}"),
                                    page_id: 0,
                                    url: String::new(),
                                    title: String::new(),
                                    parent_page_id: None,
                                },
                            })
                            .await;
                        }
                        "closed" => {
                            if targets.remove(&page).is_some() {
                                bus.dispatch(BrowserEvent::TabClosed {
                                    target_id: format!("{page:?}"),
                                })
                                .await;
                            }
                        }
                        _ => {}
                    },
                    Ok(RawEvent::PageNavigated { page, url, .. }) => {
                        if let Some(mut entry) = targets.get_mut(&page) {
                            entry.url = url.clone();
                            bus.dispatch(BrowserEvent::NavigationComplete {
                                tab: TabInfo {
                                    target_id: format!("{page:?}"),
                                    page_id: 0,
                                    url,
                                    title: String::new(),
                                    parent_page_id: None,
                                },
                            })
                            .await;
                        }
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        }));
    }

    fn detach(&self) {
        if let Some(handle) = self.bridge.lock().take() {
            handle.abort();
        }
        self.targets.clear();
    }
}

#[async_trait]
impl EventHandler<BrowserEvent> for CdpSessionWatchdog {
    fn id(&self) -> &str {
        "cdp-session-watchdog"
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
