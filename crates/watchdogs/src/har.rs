//! HAR Recording Watchdog (§4.4): records HTTPS network activity and
//! writes a HAR 1.2 document on `BrowserStopped`. The adapter's raw
//! event surface (`RawEvent::NetworkActivity`) does not carry the full
//! request/response detail a byte-exact HAR capture would (headers,
//! bodies, per-request URLs) — entries here use the page's current URL
//! and the `NetworkSignal` status as the best-effort fields available at
//! this layer.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use browser_session::{BrowserErrorKind, BrowserEvent, BrowserSession};
use cdp_adapter::events::{EventFilter, NetworkSignal, RawEvent};
use parking_lot::Mutex;
use serde::Serialize;
use soulbrowser_event_bus::{EventEnvelope, EventHandler};
use tokio::task::JoinHandle;

#[derive(Clone, Debug, Serialize)]
struct HarEntry {
    #[serde(rename = "startedDateTime")]
    started_date_time: String,
    request: HarRequest,
    response: HarResponse,
}

#[derive(Clone, Debug, Serialize)]
struct HarRequest {
    method: String,
    url: String,
}

#[derive(Clone, Debug, Serialize)]
struct HarResponse {
    status: i64,
}

#[derive(Serialize)]
struct HarLog<'a> {
    version: &'static str,
    creator: HarCreator,
    entries: &'a [HarEntry],
}

#[derive(Serialize)]
struct HarCreator {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct HarDocument<'a> {
    log: HarLog<'a>,
}

pub struct HarWatchdog {
    session: Arc<BrowserSession>,
    path: std::path::PathBuf,
    entries: Arc<Mutex<Vec<HarEntry>>>,
    bridge: Mutex<Option<JoinHandle<()>>>,
}

fn iso_now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    chrono::DateTime::<chrono::Utc>::from_timestamp(secs as i64, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

impl HarWatchdog {
    pub fn new(session: Arc<BrowserSession>, path: std::path::PathBuf) -> Self {
        Self {
            session,
            path,
            entries: Arc::new(Mutex::new(Vec::new())),
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
        let entries = Arc::clone(&self.entries);
        let session = Arc::clone(&self.session);

        *bridge = Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(RawEvent::NetworkActivity { signal, .. }) => {
                        let url = session.current_tab().map(|t| t.url).unwrap_or_default();
                        if !url.starts_with("https://") {
                            continue;
                        }
                        if let NetworkSignal::ResponseReceived { status } = signal {
                            entries.lock().push(HarEntry {
                                started_date_time: iso_now(),
                                request: HarRequest {
                                    method: "GET".to_string(),
                                    url,
                                },
                                response: HarResponse { status },
                            });
                        }
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        }));
    }

    async fn write_har(&self) -> Result<(), String> {
        let entries = self.entries.lock().clone();
        let document = HarDocument {
            log: HarLog {
                version: "1.2",
                creator: HarCreator {
                    name: "browser-session-har-watchdog",
                    version: "0.1.0",
                },
                entries: &entries,
            },
        };
        let json = serde_json::to_vec_pretty(&document).map_err(|e| e.to_string())?;
        if json.is_empty() {
            return Err("HAR document serialized to an empty payload".to_string());
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }
        tokio::fs::write(&self.path, &json)
            .await
            .map_err(|e| e.to_string())?;

        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.len() == 0 => Err("HAR file written but empty".to_string()),
            Ok(_) => Ok(()),
            Err(err) => Err(format!("failed to stat HAR output: {err}")),
        }
    }
}

#[async_trait]
impl EventHandler<BrowserEvent> for HarWatchdog {
    fn id(&self) -> &str {
        "har-watchdog"
    }

    async fn handle(&self, envelope: &EventEnvelope<BrowserEvent>) -> Result<(), String> {
        match &envelope.payload {
            BrowserEvent::BrowserConnected => {
                self.attach();
            }
            BrowserEvent::BrowserStopped => {
                if let Some(handle) = self.bridge.lock().take() {
                    handle.abort();
                }
                if let Err(message) = self.write_har().await {
                    self.session
                        .bus()
                        .dispatch(BrowserEvent::BrowserError {
                            kind: BrowserErrorKind::HarIo,
                            message,
                            details: serde_json::Value::Null,
                        })
                        .await;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
