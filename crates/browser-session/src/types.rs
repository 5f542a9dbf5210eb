//! DATA MODEL value objects owned by the session: Tab Info and the Browser
//! State Summary the agent step loop consumes each step.

use serde::{Deserialize, Serialize};

use dom_model::{DomElementNode, PaginationButton};

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct TabInfo {
    pub target_id: String,
    pub page_id: i64,
    pub url: String,
    pub title: String,
    pub parent_page_id: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PageInfo {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub page_width: f64,
    pub page_height: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PendingNetworkRequest {
    pub url: String,
    pub method: String,
    pub age_ms: u64,
}

/// Immutable once produced for a step (DATA MODEL invariant); exactly one
/// `AgentHistoryItem` holds a reference to it before it is released.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct BrowserStateSummary {
    pub url: String,
    pub title: String,
    pub tabs: Vec<TabInfo>,
    pub page_info: PageInfo,
    pub pixels_above: f64,
    pub pixels_below: f64,
    pub browser_errors: Vec<String>,
    pub loading_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_events: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_network_requests: Option<Vec<PendingNetworkRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination_buttons: Option<Vec<PaginationButton>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_popup_messages: Option<Vec<String>>,
    /// Not wire-serialized: the tree contains `Weak` parent links (DESIGN
    /// NOTES "cyclic DOM references"). The message builder renders it via
    /// `dom_model::clickable_elements_to_string` before anything leaves
    /// this process.
    #[serde(skip)]
    pub element_tree: Option<DomElementNode>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OwnerMode {
    Exclusive,
    Shared,
}

#[derive(Clone, Debug, Default)]
pub struct DownloadedFile {
    pub path: String,
    pub url: String,
    pub suggested_filename: String,
    pub file_size: u64,
}
