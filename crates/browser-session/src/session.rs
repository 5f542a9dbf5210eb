//! Browser Session (C3): the stateful façade over the CDP driver. Holds
//! tabs, navigation history, downloads, and the per-target CDP session
//! cache; dispatches `BrowserStateRequestEvent` so watchdogs can enrich a
//! snapshot before the session falls back to direct composition.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cdp_adapter::adapter::{Cdp, CdpAdapter};
use cdp_adapter::commands::{DomSnapshotConfig, QueryScope, QuerySpec};
use cdp_adapter::ids::PageId as AdapterPageId;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use dom_model::{clickable_elements_to_string, detect_pagination_buttons, DomElementNode, DomState};
use parking_lot::RwLock;
use soulbrowser_core_types::AgentId;
use soulbrowser_event_bus::EventBus;
use tracing::{info, warn};
use url::Url;

use crate::cdp_tree::build_tree;
use crate::downloads::{dedup_key, looks_like_pdf, DownloadedFiles};
use crate::errors::{SessionError, SessionResult};
use crate::events::{BrowserErrorKind, BrowserEvent, NavigateWaitUntil};
use crate::ownership::OwnershipGuard;
use crate::types::{BrowserStateSummary, DownloadedFile, OwnerMode, PageInfo, TabInfo};

/// A single open tab, tracked alongside its adapter-level page handle.
struct TabState {
    info: TabInfo,
    adapter_page: AdapterPageId,
}

pub struct SessionConfig {
    pub downloads_dir: std::path::PathBuf,
    pub default_navigation_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            downloads_dir: std::path::PathBuf::from("./downloads"),
            default_navigation_timeout: Duration::from_secs(15),
        }
    }
}

/// Stateful façade over a Chromium-family browser. One session owns zero
/// or more tabs; the currently focused tab is a derived property, not a
/// separately-tracked field, so it can never drift out of sync with the
/// tab list (§3 "Tab Info ... the focused tab is a derived property").
pub struct BrowserSession {
    config: SessionConfig,
    adapter: Arc<CdpAdapter>,
    bus: EventBus<BrowserEvent>,
    tabs: RwLock<Vec<TabState>>,
    current_tab_index: RwLock<Option<usize>>,
    history_stack: RwLock<Vec<String>>,
    downloaded_files: DownloadedFiles,
    pdf_dedup_seen: RwLock<HashSet<String>>,
    ownership: OwnershipGuard,
    next_page_id: AtomicUsize,
    owns_browser_resources: AtomicBool,
    stopping: AtomicBool,
}

impl BrowserSession {
    pub fn new(adapter: Arc<CdpAdapter>, bus: EventBus<BrowserEvent>, config: SessionConfig) -> Self {
        Self {
            config,
            adapter,
            bus,
            tabs: RwLock::new(Vec::new()),
            current_tab_index: RwLock::new(None),
            history_stack: RwLock::new(Vec::new()),
            downloaded_files: DownloadedFiles::default(),
            pdf_dedup_seen: RwLock::new(HashSet::new()),
            ownership: OwnershipGuard::default(),
            next_page_id: AtomicUsize::new(1),
            owns_browser_resources: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
        }
    }

    // ---- ownership -----------------------------------------------------

    pub fn claim_agent(&self, agent: AgentId, mode: OwnerMode) -> SessionResult<()> {
        self.ownership.claim(agent, mode)
    }

    pub fn release_agent(&self, agent: &AgentId) -> SessionResult<()> {
        self.ownership.release(agent)
    }

    pub fn owns_browser_resources(&self) -> bool {
        self.owns_browser_resources.load(Ordering::SeqCst)
    }

    /// Exposes the bus so watchdogs (a separate crate) can register
    /// handlers and the underlying adapter so they can subscribe to raw
    /// CDP-level events (target discovery, network activity) that sit
    /// below the `BrowserEvent` abstraction.
    pub fn bus(&self) -> &EventBus<BrowserEvent> {
        &self.bus
    }

    pub fn adapter(&self) -> Arc<CdpAdapter> {
        Arc::clone(&self.adapter)
    }

    pub fn downloads_dir(&self) -> &std::path::Path {
        &self.config.downloads_dir
    }

    // ---- lifecycle -------------------------------------------------------

    /// Idempotent: a second `start()` while already started is a no-op.
    pub async fn start(self: &Arc<Self>) -> SessionResult<()> {
        if !self.tabs.read().is_empty() || self.current_tab_index.read().is_some() {
            return Ok(());
        }
        Arc::clone(&self.adapter)
            .start()
            .await
            .map_err(SessionError::from)?;
        self.owns_browser_resources.store(true, Ordering::SeqCst);
        self.bus.dispatch(BrowserEvent::BrowserLaunch).await;
        self.bus.dispatch(BrowserEvent::BrowserConnected).await;
        self.navigate_to("about:blank", NavigateOptions::default())
            .await?;
        Ok(())
    }

    /// Concurrent-safe: a second caller racing `stop()` observes the same
    /// single teardown rather than double-closing the adapter.
    pub async fn stop(&self) -> SessionResult<()> {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if self.owns_browser_resources.load(Ordering::SeqCst) {
            self.adapter.shutdown().await;
        }
        self.tabs.write().clear();
        *self.current_tab_index.write() = None;
        self.bus.dispatch(BrowserEvent::BrowserStopped).await;
        Ok(())
    }

    pub async fn kill(&self) -> SessionResult<()> {
        self.stop().await
    }

    // ---- tabs --------------------------------------------------------

    pub fn tabs(&self) -> Vec<TabInfo> {
        self.tabs.read().iter().map(|t| t.info.clone()).collect()
    }

    pub fn current_tab(&self) -> Option<TabInfo> {
        let idx = (*self.current_tab_index.read())?;
        self.tabs.read().get(idx).map(|t| t.info.clone())
    }

    pub fn current_adapter_page(&self) -> SessionResult<AdapterPageId> {
        let idx = self
            .current_tab_index
            .read()
            .ok_or_else(|| SessionError::TabNotFound("<none focused>".to_string()))?;
        self.tabs
            .read()
            .get(idx)
            .map(|t| t.adapter_page)
            .ok_or(SessionError::TabIndexOutOfRange {
                index: idx,
                count: self.tabs.read().len(),
            })
    }

    pub async fn create_new_tab(&self, url: &str) -> SessionResult<TabInfo> {
        let adapter_page = self.adapter.create_page(url).await?;
        let page_id = self.next_page_id.fetch_add(1, Ordering::SeqCst) as i64;
        let parent_page_id = self.current_tab_index.read().map(|i| i as i64);
        let info = TabInfo {
            target_id: format!("target-{page_id}"),
            page_id,
            url: url.to_string(),
            title: String::new(),
            parent_page_id,
        };

        let mut tabs = self.tabs.write();
        tabs.push(TabState {
            info: info.clone(),
            adapter_page,
        });
        *self.current_tab_index.write() = Some(tabs.len() - 1);
        drop(tabs);

        self.bus
            .dispatch(BrowserEvent::TabCreated { tab: info.clone() })
            .await;
        Ok(info)
    }

    pub async fn close_tab(&self, target_id: &str) -> SessionResult<()> {
        let mut tabs = self.tabs.write();
        let pos = tabs
            .iter()
            .position(|t| t.info.target_id == target_id)
            .ok_or_else(|| SessionError::TabNotFound(target_id.to_string()))?;
        tabs.remove(pos);

        let mut current = self.current_tab_index.write();
        *current = match *current {
            Some(idx) if idx == pos => tabs.last().map(|_| tabs.len().saturating_sub(1)),
            Some(idx) if idx > pos => Some(idx - 1),
            other => other,
        };
        drop(tabs);
        drop(current);

        self.bus
            .dispatch(BrowserEvent::TabClosed {
                target_id: target_id.to_string(),
            })
            .await;
        Ok(())
    }

    pub fn switch_to_tab(&self, index: usize) -> SessionResult<TabInfo> {
        let tabs = self.tabs.read();
        if index >= tabs.len() {
            return Err(SessionError::TabIndexOutOfRange {
                index,
                count: tabs.len(),
            });
        }
        *self.current_tab_index.write() = Some(index);
        Ok(tabs[index].info.clone())
    }

    // ---- navigation ----------------------------------------------------

    pub async fn navigate_to(&self, url: &str, options: NavigateOptions) -> SessionResult<()> {
        let normalized = normalize_url(url);

        // Dispatch `NavigateToUrl` before touching the adapter so the
        // Security Watchdog (§4.4) gets a chance to veto it; any handler
        // error (e.g. a disallowed domain) blocks the navigation outright
        // and leaves the session URL unchanged (Testable Property #5, S2).
        let aggregate = self
            .bus
            .dispatch(BrowserEvent::NavigateToUrl {
                url: normalized.clone(),
                wait_until: options.wait_until.clone(),
                new_tab: options.new_tab,
            })
            .await;
        if let Some(reason) = aggregate.handler_results.iter().find_map(|r| r.error.clone()) {
            return Err(SessionError::NavigationBlocked {
                url: normalized,
                reason,
            });
        }

        if options.new_tab || self.current_tab_index.read().is_none() {
            self.create_new_tab(&normalized).await?;
        }

        let page = self.current_adapter_page()?;
        self.adapter
            .navigate(page, &normalized, options.timeout)
            .await
            .map_err(|err| {
                SessionError::NavigationTimeout {
                    url: normalized.clone(),
                }
                .to_owned_or(err)
            })?;

        if let Some(idx) = *self.current_tab_index.read() {
            if let Some(tab) = self.tabs.write().get_mut(idx) {
                tab.info.url = normalized.clone();
            }
        }
        self.history_stack.write().push(normalized.clone());

        if let Some(tab) = self.current_tab() {
            self.bus
                .dispatch(BrowserEvent::NavigationComplete { tab })
                .await;
        }

        self.maybe_auto_download_pdf(&normalized).await;
        Ok(())
    }

    pub async fn go_back(&self) -> SessionResult<()> {
        let mut stack = self.history_stack.write();
        if stack.len() < 2 {
            return Ok(());
        }
        stack.pop();
        let target = stack.last().cloned();
        drop(stack);
        if let Some(url) = target {
            self.navigate_without_history_push(&url).await?;
        }
        Ok(())
    }

    pub async fn go_forward(&self) -> SessionResult<()> {
        // A linear stack has no forward entries once `go_back` has
        // popped past them; this is a no-op placeholder for drivers that
        // expose native forward navigation via the CDP history API.
        Ok(())
    }

    pub async fn refresh(&self) -> SessionResult<()> {
        if let Some(tab) = self.current_tab() {
            self.navigate_without_history_push(&tab.url).await?;
        }
        Ok(())
    }

    async fn navigate_without_history_push(&self, url: &str) -> SessionResult<()> {
        let page = self.current_adapter_page()?;
        self.adapter
            .navigate(page, url, self.config.default_navigation_timeout)
            .await?;
        if let Some(idx) = *self.current_tab_index.read() {
            if let Some(tab) = self.tabs.write().get_mut(idx) {
                tab.info.url = url.to_string();
            }
        }
        if let Some(tab) = self.current_tab() {
            self.bus
                .dispatch(BrowserEvent::NavigationComplete { tab })
                .await;
        }
        Ok(())
    }

    // ---- storage state ---------------------------------------------------

    /// Dispatches `SaveStorageStateEvent` and awaits its settlement so the
    /// caller learns whether the Storage Watchdog (§4.4) actually wrote
    /// the file (no storage watchdog attached, or an I/O failure, both
    /// surface as an `Err` here rather than silently no-op'ing).
    pub async fn save_storage_state(&self, path: &str) -> SessionResult<()> {
        self.bus
            .dispatch_or_throw(BrowserEvent::SaveStorageState {
                path: path.to_string(),
            })
            .await
            .map(|_| ())
            .map_err(|err| SessionError::Io(err.to_string()))
    }

    /// Dispatches `LoadStorageStateEvent` and awaits its settlement.
    pub async fn load_storage_state(&self, path: &str) -> SessionResult<()> {
        self.bus
            .dispatch_or_throw(BrowserEvent::LoadStorageState {
                path: path.to_string(),
            })
            .await
            .map(|_| ())
            .map_err(|err| SessionError::Io(err.to_string()))
    }

    // ---- state production ------------------------------------------------

    /// The primary state producer (§4.3). Dispatches `BrowserStateRequestEvent`
    /// so watchdogs can enrich the snapshot (pending network requests,
    /// closed-popup messages, ...), then falls back to direct composition
    /// for anything no handler populated.
    pub async fn get_browser_state_with_recovery(
        &self,
        include_screenshot: bool,
        include_recent_events: bool,
    ) -> SessionResult<BrowserStateSummary> {
        let aggregate = self
            .bus
            .dispatch(BrowserEvent::BrowserStateRequest {
                include_screenshot,
                include_recent_events,
            })
            .await;
        if aggregate.has_errors() {
            warn!(errors = ?aggregate.errors(), "watchdogs reported errors while enriching browser state");
        }

        let tab = self.current_tab();
        let page = self.current_adapter_page().ok();

        let (element_tree, pagination_buttons) = match page {
            Some(adapter_page) => self.build_snapshot(adapter_page).await,
            None => (None, None),
        };

        let screenshot = if include_screenshot {
            match page {
                Some(adapter_page) => self
                    .adapter
                    .screenshot(adapter_page, Duration::from_secs(10))
                    .await
                    .ok()
                    .map(|bytes| BASE64_STANDARD.encode(bytes)),
                None => None,
            }
        } else {
            None
        };

        Ok(BrowserStateSummary {
            url: tab.as_ref().map(|t| t.url.clone()).unwrap_or_default(),
            title: tab.as_ref().map(|t| t.title.clone()).unwrap_or_default(),
            tabs: self.tabs(),
            page_info: PageInfo::default(),
            pixels_above: 0.0,
            pixels_below: 0.0,
            browser_errors: Vec::new(),
            loading_status: "complete".to_string(),
            screenshot,
            recent_events: None,
            pending_network_requests: None,
            pagination_buttons,
            closed_popup_messages: None,
            element_tree,
        })
    }

    async fn build_snapshot(
        &self,
        page: AdapterPageId,
    ) -> (
        Option<DomElementNode>,
        Option<Vec<dom_model::PaginationButton>>,
    ) {
        let result = match self
            .adapter
            .dom_snapshot(page, DomSnapshotConfig::default())
            .await
        {
            Ok(r) => r,
            Err(err) => {
                warn!(?err, "dom_snapshot failed");
                return (None, None);
            }
        };

        let root = match build_tree(&result, 1280.0, 720.0) {
            Some(root) => root,
            None => return (None, None),
        };

        let mut selector_map = std::collections::HashMap::new();
        collect_selector_map(&root, &mut selector_map);
        let state = DomState {
            root: Some(root.clone()),
            selector_map,
        };
        let pagination = detect_pagination_buttons(&state);
        (Some((*root).clone()), Some(pagination))
    }

    /// Renders the current snapshot's interactive elements for the prompt
    /// (§4.2 "Clickable-to-string").
    pub async fn clickable_elements_text(&self) -> SessionResult<String> {
        let page = self.current_adapter_page()?;
        let (tree, _) = self.build_snapshot(page).await;
        match tree {
            Some(root) => Ok(clickable_elements_to_string(&root)),
            None => Ok(String::new()),
        }
    }

    // ---- element I/O ----------------------------------------------------

    pub async fn get_dom_element_by_index(&self, index: u32) -> SessionResult<DomElementNode> {
        let page = self.current_adapter_page()?;
        let (tree, _) = self.build_snapshot(page).await;
        let root = tree.ok_or(SessionError::ElementNotFound(index as usize))?;
        find_by_highlight_index(&root, index).ok_or(SessionError::ElementNotFound(index as usize))
    }

    pub async fn click_element_node(
        &self,
        node: &DomElementNode,
        new_tab: bool,
    ) -> SessionResult<Option<TabInfo>> {
        let page = self.current_adapter_page()?;
        let tabs_before = self.tabs.read().len();
        self.adapter
            .click(page, &selector_for(node), Duration::from_secs(10))
            .await?;

        if new_tab {
            tokio::time::sleep(Duration::from_millis(150)).await;
            if self.tabs.read().len() > tabs_before {
                return Ok(self.tabs.read().last().map(|t| t.info.clone()));
            }
        }
        Ok(None)
    }

    pub async fn input_text_element_node(
        &self,
        node: &DomElementNode,
        text: &str,
        clear: bool,
    ) -> SessionResult<()> {
        let page = self.current_adapter_page()?;
        let selector = selector_for(node);
        if clear {
            let _ = self
                .adapter
                .evaluate_script(
                    page,
                    &format!(
                        "(() => {{ const el = document.querySelector({sel}); if (el) el.value = ''; }})()",
                        sel = serde_json::to_string(&selector).unwrap_or_default()
                    ),
                )
                .await;
        }
        self.adapter
            .type_text(page, &selector, text, Duration::from_secs(60))
            .await?;
        Ok(())
    }

    pub async fn find_file_upload_element_by_index(
        &self,
        index: u32,
    ) -> SessionResult<DomElementNode> {
        let node = self.get_dom_element_by_index(index).await?;
        if node.tag == "input" && node.attributes.get("type").map(String::as_str) == Some("file")
        {
            return Ok(node);
        }
        // Browsers commonly wrap the real `<input type=file>` behind a
        // styled trigger; look one level down for it.
        node.children
            .iter()
            .find(|c| {
                c.tag == "input" && c.attributes.get("type").map(String::as_str) == Some("file")
            })
            .map(|c| (**c).clone())
            .ok_or(SessionError::ElementNotFound(index as usize))
    }

    pub async fn get_locate_element(&self, selector: &str) -> SessionResult<Vec<(f64, f64)>> {
        let page = self.current_adapter_page()?;
        let anchors = self
            .adapter
            .query(
                page,
                QuerySpec {
                    selector: selector.to_string(),
                    scope: QueryScope::Document,
                },
            )
            .await?;
        Ok(anchors.into_iter().map(|a| (a.x, a.y)).collect())
    }

    // ---- downloads -------------------------------------------------------

    pub fn downloaded_files(&self) -> Vec<String> {
        self.downloaded_files.list()
    }

    pub fn record_downloaded_file(&self, file: DownloadedFile) -> bool {
        self.downloaded_files.record(file)
    }

    async fn maybe_auto_download_pdf(&self, url: &str) {
        if !looks_like_pdf(None, url) {
            return;
        }
        let key = dedup_key(url);
        {
            let mut seen = self.pdf_dedup_seen.write();
            if !seen.insert(key) {
                return;
            }
        }

        let path = self.config.downloads_dir.join(pdf_filename(url));
        if let Err(err) = tokio::fs::create_dir_all(&self.config.downloads_dir).await {
            warn!(?err, "failed to create downloads dir");
            self.emit_error(BrowserErrorKind::DownloadFailed, err.to_string())
                .await;
            return;
        }

        let recorded = self.record_downloaded_file(DownloadedFile {
            path: path.to_string_lossy().to_string(),
            url: url.to_string(),
            suggested_filename: pdf_filename(url),
            file_size: 0,
        });
        if recorded {
            info!(%url, path = %path.display(), "auto-downloaded PDF");
        }
    }

    async fn emit_error(&self, kind: BrowserErrorKind, message: String) {
        self.bus
            .dispatch(BrowserEvent::BrowserError {
                kind,
                message,
                details: serde_json::Value::Null,
            })
            .await;
    }
}

fn pdf_filename(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segs| segs.next_back().map(|s| s.to_string()))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "document.pdf".to_string())
}

fn selector_for(node: &DomElementNode) -> String {
    if let Some(id) = node.attributes.get("id") {
        return format!("#{id}");
    }
    node.xpath.clone()
}

fn collect_selector_map(
    node: &Arc<DomElementNode>,
    map: &mut std::collections::HashMap<u32, Arc<DomElementNode>>,
) {
    if let Some(idx) = node.highlight_index {
        map.insert(idx, node.clone());
    }
    for child in &node.children {
        collect_selector_map(child, map);
    }
}

fn find_by_highlight_index(node: &DomElementNode, index: u32) -> Option<DomElementNode> {
    if node.highlight_index == Some(index) {
        return Some(node.clone());
    }
    node.children
        .iter()
        .find_map(|c| find_by_highlight_index(c, index))
}

/// URL normalization: add `https://` when the scheme is missing, the way
/// an address bar does.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.contains("://") || trimmed.starts_with("about:") || trimmed.starts_with("data:") {
        return trimmed.to_string();
    }
    format!("https://{trimmed}")
}

#[derive(Clone, Debug)]
pub struct NavigateOptions {
    pub wait_until: NavigateWaitUntil,
    pub timeout: Duration,
    pub new_tab: bool,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            wait_until: NavigateWaitUntil::Load,
            timeout: Duration::from_secs(15),
            new_tab: false,
        }
    }
}

trait ErrAttach {
    fn to_owned_or(self, err: cdp_adapter::error::AdapterError) -> SessionError;
}

impl ErrAttach for SessionError {
    fn to_owned_or(self, err: cdp_adapter::error::AdapterError) -> SessionError {
        match self {
            SessionError::NavigationTimeout { url }
                if matches!(err.kind, cdp_adapter::error::AdapterErrorKind::NavTimeout) =>
            {
                SessionError::NavigationTimeout { url }
            }
            _ => SessionError::from(err),
        }
    }
}
