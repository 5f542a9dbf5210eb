//! Storage Watchdog (§4.4): serializes cookies + per-origin `localStorage`
//! to a JSON storage-state file on `SaveStorageStateEvent`, and restores
//! them on `LoadStorageStateEvent`, reporting counts either way.

use std::sync::Arc;

use async_trait::async_trait;
use browser_session::{BrowserErrorKind, BrowserEvent, BrowserSession};
use serde::{Deserialize, Serialize};
use soulbrowser_event_bus::{EventEnvelope, EventHandler};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StorageState {
    pub cookies: Vec<serde_json::Value>,
    pub origins: Vec<OriginStorage>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OriginStorage {
    pub origin: String,
    pub local_storage: Vec<(String, String)>,
}

pub struct StorageWatchdog {
    session: Arc<BrowserSession>,
}

impl StorageWatchdog {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }

    async fn capture(&self) -> Result<StorageState, String> {
        let page = self
            .session
            .current_adapter_page()
            .map_err(|err| err.to_string())?;
        let adapter = self.session.adapter();

        let cookies_value = adapter
            .evaluate_script(page, "document.cookie")
            .await
            .map_err(|err| err.to_string())?;
        let cookies = match cookies_value.as_str() {
            Some(raw) if !raw.is_empty() => raw
                .split("; ")
                .map(|pair| serde_json::json!({ "raw": pair }))
                .collect(),
            _ => Vec::new(),
        };

        let local_storage_value = adapter
            .evaluate_script(
                page,
                "JSON.stringify(Object.entries(window.localStorage || {}))",
            )
            .await
            .map_err(|err| err.to_string())?;
        let local_storage: Vec<(String, String)> = local_storage_value
            .as_str()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();

        let origin = self
            .session
            .current_tab()
            .map(|t| t.url)
            .unwrap_or_default();

        Ok(StorageState {
            cookies,
            origins: vec![OriginStorage {
                origin,
                local_storage,
            }],
        })
    }

    async fn restore(&self, state: &StorageState) -> Result<(), String> {
        let page = self
            .session
            .current_adapter_page()
            .map_err(|err| err.to_string())?;
        let adapter = self.session.adapter();
        for origin in &state.origins {
            for (key, value) in &origin.local_storage {
                let script = format!(
                    "window.localStorage.setItem({}, {})",
                    serde_json::to_string(key).unwrap_or_default(),
                    serde_json::to_string(value).unwrap_or_default()
                );
                let _ = adapter.evaluate_script(page, &script).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler<BrowserEvent> for StorageWatchdog {
    fn id(&self) -> &str {
        "storage-watchdog"
    }

    async fn handle(&self, envelope: &EventEnvelope<BrowserEvent>) -> Result<(), String> {
        // Like the security watchdog, never await a child dispatch from
        // inside a handler: the bus's drain task can't pick the child up
        // until this call returns, so an inline await just deadlocks
        // until the parent event itself times out (§4.1). The
        // saved/loaded notification is fired on a spawned task instead.
        match &envelope.payload {
            BrowserEvent::SaveStorageState { path } => {
                let state = self.capture().await?;
                let json = serde_json::to_vec_pretty(&state).map_err(|e| e.to_string())?;
                tokio::fs::write(path, &json)
                    .await
                    .map_err(|e| e.to_string())?;

                let bus = self.session.bus().clone();
                let path = path.clone();
                let cookie_count = state.cookies.len();
                let origin_count = state.origins.len();
                tokio::spawn(async move {
                    bus.dispatch(BrowserEvent::StorageStateSaved {
                        path,
                        cookie_count,
                        origin_count,
                    })
                    .await;
                });
            }
            BrowserEvent::LoadStorageState { path } => {
                let bytes = tokio::fs::read(path).await.map_err(|e| e.to_string())?;
                let state: StorageState =
                    serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;
                self.restore(&state).await?;

                let bus = self.session.bus().clone();
                let path = path.clone();
                let cookie_count = state.cookies.len();
                let origin_count = state.origins.len();
                tokio::spawn(async move {
                    bus.dispatch(BrowserEvent::StorageStateLoaded {
                        path,
                        cookie_count,
                        origin_count,
                    })
                    .await;
                });
            }
            _ => {}
        }
        Ok(())
    }
}

/// Helper used by callers that need to surface a storage I/O failure as
/// a `BrowserError` instead of only failing the handler result.
pub async fn emit_storage_error(session: &BrowserSession, message: String) {
    session
        .bus()
        .dispatch(BrowserEvent::BrowserError {
            kind: BrowserErrorKind::StorageIo,
            message,
            details: serde_json::Value::Null,
        })
        .await;
}
