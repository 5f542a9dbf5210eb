//! Downloads Watchdog (§4.4): tracks in-flight browser downloads by
//! GUID, appends completed ones to the session's deduped downloaded
//! files list, and promotes PDF/attachment/octet-stream network
//! responses to synthetic downloads.

use std::sync::Arc;

use async_trait::async_trait;
use browser_session::{
    is_attachment_download, looks_like_pdf, sanitize_filename, BrowserEvent, BrowserSession,
    DownloadState, DownloadedFile,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use soulbrowser_event_bus::{EventEnvelope, EventHandler};

#[derive(Clone, Debug)]
struct ActiveDownload {
    url: String,
    suggested_filename: String,
    received_bytes: u64,
    total_bytes: Option<u64>,
    state: DownloadState,
}

/// Closures registered via `on_start`/`on_progress`/`on_complete`. The
/// original implementation accepted these in both an options-object and
/// a positional-arguments form; one closure-based registration API
/// covers both here.
#[derive(Default)]
pub struct DownloadCallbacks {
    on_start: RwLock<Vec<Box<dyn Fn(&str, &str) + Send + Sync>>>,
    on_progress: RwLock<Vec<Box<dyn Fn(&str, u64, Option<u64>) + Send + Sync>>>,
    on_complete: RwLock<Vec<Box<dyn Fn(&str, &str) + Send + Sync>>>,
}

impl DownloadCallbacks {
    pub fn on_start(&self, callback: impl Fn(&str, &str) + Send + Sync + 'static) {
        self.on_start.write().push(Box::new(callback));
    }

    pub fn on_progress(&self, callback: impl Fn(&str, u64, Option<u64>) + Send + Sync + 'static) {
        self.on_progress.write().push(Box::new(callback));
    }

    pub fn on_complete(&self, callback: impl Fn(&str, &str) + Send + Sync + 'static) {
        self.on_complete.write().push(Box::new(callback));
    }

    fn fire_start(&self, guid: &str, url: &str) {
        for cb in self.on_start.read().iter() {
            cb(guid, url);
        }
    }

    fn fire_progress(&self, guid: &str, received: u64, total: Option<u64>) {
        for cb in self.on_progress.read().iter() {
            cb(guid, received, total);
        }
    }

    fn fire_complete(&self, guid: &str, path: &str) {
        for cb in self.on_complete.read().iter() {
            cb(guid, path);
        }
    }
}

pub struct DownloadsWatchdog {
    session: Arc<BrowserSession>,
    active: DashMap<String, ActiveDownload>,
    callbacks: Arc<DownloadCallbacks>,
}

impl DownloadsWatchdog {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self {
            session,
            active: DashMap::new(),
            callbacks: Arc::new(DownloadCallbacks::default()),
        }
    }

    pub fn callbacks(&self) -> Arc<DownloadCallbacks> {
        Arc::clone(&self.callbacks)
    }

    pub fn active_downloads(&self) -> Vec<(String, String, DownloadState)> {
        self.active
            .iter()
            .map(|e| (e.key().clone(), e.url.clone(), e.state.clone()))
            .collect()
    }

    /// Synthetic-download promotion for responses CDP's download manager
    /// never surfaces as a `Page.downloadWillBegin` event: a PDF opened
    /// inline, or a response explicitly marked `attachment`/octet-stream.
    pub fn maybe_promote_network_response(
        &self,
        guid: &str,
        url: &str,
        mime_type: Option<&str>,
        content_disposition: Option<&str>,
    ) -> bool {
        if looks_like_pdf(mime_type, url) || is_attachment_download(mime_type, content_disposition) {
            self.active.insert(
                guid.to_string(),
                ActiveDownload {
                    url: url.to_string(),
                    suggested_filename: String::new(),
                    received_bytes: 0,
                    total_bytes: None,
                    state: DownloadState::InProgress,
                },
            );
            self.callbacks.fire_start(guid, url);
            return true;
        }
        false
    }
}

#[async_trait]
impl EventHandler<BrowserEvent> for DownloadsWatchdog {
    fn id(&self) -> &str {
        "downloads-watchdog"
    }

    async fn handle(&self, envelope: &EventEnvelope<BrowserEvent>) -> Result<(), String> {
        match &envelope.payload {
            BrowserEvent::BrowserLaunch => {
                tokio::fs::create_dir_all(self.session.downloads_dir())
                    .await
                    .map_err(|err| err.to_string())?;
            }
            BrowserEvent::DownloadStarted {
                guid,
                url,
                suggested_filename,
            } => {
                self.active.insert(
                    guid.clone(),
                    ActiveDownload {
                        url: url.clone(),
                        suggested_filename: suggested_filename.clone(),
                        received_bytes: 0,
                        total_bytes: None,
                        state: DownloadState::InProgress,
                    },
                );
                self.callbacks.fire_start(guid, url);
            }
            BrowserEvent::DownloadProgress {
                guid,
                received_bytes,
                total_bytes,
                state,
            } => {
                if let Some(mut entry) = self.active.get_mut(guid) {
                    entry.received_bytes = *received_bytes;
                    entry.total_bytes = *total_bytes;
                    entry.state = state.clone();
                }
                self.callbacks.fire_progress(guid, *received_bytes, *total_bytes);
            }
            BrowserEvent::FileDownloaded {
                guid,
                path,
                file_size,
            } => {
                let (url, suggested_filename) = self
                    .active
                    .remove(guid)
                    .map(|(_, d)| (d.url, d.suggested_filename))
                    .unwrap_or_default();

                let existing: std::collections::HashSet<String> = std::collections::HashSet::new();
                let filename = if suggested_filename.is_empty() {
                    sanitize_filename("download", &existing)
                } else {
                    sanitize_filename(&suggested_filename, &existing)
                };

                self.session.record_downloaded_file(DownloadedFile {
                    path: path.clone(),
                    url,
                    suggested_filename: filename,
                    file_size: *file_size,
                });
                self.callbacks.fire_complete(guid, path);
            }
            BrowserEvent::BrowserStateRequest { .. } => {
                if let Some(tab) = self.session.current_tab() {
                    let envelope_for_reply = EventEnvelope::new(
                        BrowserEvent::NavigationComplete { tab },
                        std::time::Duration::from_secs(5),
                    )
                    .with_parent(envelope.event_id.clone());
                    self.session.bus().dispatch_envelope(envelope_for_reply).await;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
