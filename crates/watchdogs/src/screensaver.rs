//! About:blank DVD Screensaver Watchdog (§4.4): purely cosmetic. When a
//! tab sits idle on `about:blank` for `idle_after`, emits
//! `AboutBlankDVDScreensaverShownEvent` so the UI can render a
//! placeholder instead of a blank rectangle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use browser_session::{BrowserEvent, BrowserSession};
use parking_lot::Mutex;
use soulbrowser_event_bus::{EventEnvelope, EventHandler};
use tokio::task::JoinHandle;

pub struct AboutBlankScreensaverWatchdog {
    session: Arc<BrowserSession>,
    idle_after: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl AboutBlankScreensaverWatchdog {
    pub fn new(session: Arc<BrowserSession>, idle_after: Duration) -> Self {
        Self {
            session,
            idle_after,
            pending: Mutex::new(None),
        }
    }

    fn cancel_pending(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }

    fn arm(&self, target_id: String) {
        self.cancel_pending();
        let session = Arc::clone(&self.session);
        let idle_after = self.idle_after;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(idle_after).await;
            let still_blank = session
                .current_tab()
                .map(|t| t.target_id == target_id && t.url == "about:blank")
                .unwrap_or(false);
            if still_blank {
                session
                    .bus()
                    .dispatch(BrowserEvent::AboutBlankDVDScreensaverShown { target_id })
                    .await;
            }
        });
        *self.pending.lock() = Some(handle);
    }
}

#[async_trait]
impl EventHandler<BrowserEvent> for AboutBlankScreensaverWatchdog {
    fn id(&self) -> &str {
        "about-blank-screensaver-watchdog"
    }

    async fn handle(&self, envelope: &EventEnvelope<BrowserEvent>) -> Result<(), String> {
        if let BrowserEvent::NavigationComplete { tab } = &envelope.payload {
            if tab.url == "about:blank" {
                self.arm(tab.target_id.clone());
            } else {
                self.cancel_pending();
            }
        }
        Ok(())
    }
}
