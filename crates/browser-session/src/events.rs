//! The bus event class set for the Browser Session + Watchdogs substrate
//! (§4.1/§4.3/§4.4). One tagged enum, dispatched on `soulbrowser_event_bus::EventBus<BrowserEvent>`
//! — the DESIGN NOTES' "dynamic dispatch over events" recipe: handlers key off
//! `name()`, not off a Rust type, so the bus itself never needs an `Any` downcast.

use serde::{Deserialize, Serialize};
use soulbrowser_event_bus::BusEvent;

use crate::types::TabInfo;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum NavigateWaitUntil {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BrowserErrorKind {
    NavigationBlocked,
    NetworkTimeout,
    TargetCrash,
    TargetUnresponsive,
    DownloadFailed,
    DialogUnexpected,
    StorageIo,
    HarIo,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DownloadState {
    InProgress,
    Completed,
    Cancelled,
    Interrupted,
}

/// One tagged variant per event class named across §4.3/§4.4. `name()` values
/// must stay pairwise non-substring (Testable Property #7); see
/// `tests::event_names_are_pairwise_non_substring` for the enforced check.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BrowserEvent {
    BrowserLaunch,
    BrowserConnected,
    BrowserStopped,
    BrowserStateRequest {
        include_screenshot: bool,
        include_recent_events: bool,
    },
    NavigateToUrl {
        url: String,
        wait_until: NavigateWaitUntil,
        new_tab: bool,
    },
    NavigationComplete {
        tab: TabInfo,
    },
    TabCreated {
        tab: TabInfo,
    },
    TabClosed {
        target_id: String,
    },
    CloseTab {
        target_id: String,
    },
    BrowserError {
        kind: BrowserErrorKind,
        message: String,
        details: serde_json::Value,
    },
    TargetCrashed {
        target_id: String,
    },
    TargetUnresponsive {
        target_id: String,
        consecutive_failures: u32,
    },
    DownloadStarted {
        guid: String,
        url: String,
        suggested_filename: String,
    },
    DownloadProgress {
        guid: String,
        received_bytes: u64,
        total_bytes: Option<u64>,
        state: DownloadState,
    },
    FileDownloaded {
        guid: String,
        path: String,
        file_size: u64,
    },
    SaveStorageState {
        path: String,
    },
    LoadStorageState {
        path: String,
    },
    StorageStateSaved {
        path: String,
        cookie_count: usize,
        origin_count: usize,
    },
    StorageStateLoaded {
        path: String,
        cookie_count: usize,
        origin_count: usize,
    },
    DialogOpened {
        target_id: String,
        dialog_type: String,
        message: String,
    },
    AboutBlankDVDScreensaverShown {
        target_id: String,
    },
}

impl BusEvent for BrowserEvent {
    fn name(&self) -> &'static str {
        match self {
            BrowserEvent::BrowserLaunch => "BrowserLaunch",
            BrowserEvent::BrowserConnected => "BrowserConnected",
            BrowserEvent::BrowserStopped => "BrowserStopped",
            BrowserEvent::BrowserStateRequest { .. } => "BrowserStateRequest",
            BrowserEvent::NavigateToUrl { .. } => "NavigateToUrl",
            BrowserEvent::NavigationComplete { .. } => "NavigationComplete",
            BrowserEvent::TabCreated { .. } => "TabCreated",
            BrowserEvent::TabClosed { .. } => "TabClosed",
            BrowserEvent::CloseTab { .. } => "CloseTab",
            BrowserEvent::BrowserError { .. } => "BrowserError",
            BrowserEvent::TargetCrashed { .. } => "TargetCrashed",
            BrowserEvent::TargetUnresponsive { .. } => "TargetUnresponsive",
            BrowserEvent::DownloadStarted { .. } => "DownloadStarted",
            BrowserEvent::DownloadProgress { .. } => "DownloadProgress",
            BrowserEvent::FileDownloaded { .. } => "FileDownloaded",
            BrowserEvent::SaveStorageState { .. } => "SaveStorageState",
            BrowserEvent::LoadStorageState { .. } => "LoadStorageState",
            BrowserEvent::StorageStateSaved { .. } => "StorageStateSaved",
            BrowserEvent::StorageStateLoaded { .. } => "StorageStateLoaded",
            BrowserEvent::DialogOpened { .. } => "DialogOpened",
            BrowserEvent::AboutBlankDVDScreensaverShown { .. } => "AboutBlankDVDScreensaverShown",
        }
    }
}

pub const ALL_EVENT_NAMES: &[&str] = &[
    "BrowserLaunch",
    "BrowserConnected",
    "BrowserStopped",
    "BrowserStateRequest",
    "NavigateToUrl",
    "NavigationComplete",
    "TabCreated",
    "TabClosed",
    "CloseTab",
    "BrowserError",
    "TargetCrashed",
    "TargetUnresponsive",
    "DownloadStarted",
    "DownloadProgress",
    "FileDownloaded",
    "SaveStorageState",
    "LoadStorageState",
    "StorageStateSaved",
    "StorageStateLoaded",
    "DialogOpened",
    "AboutBlankDVDScreensaverShown",
];

#[cfg(test)]
mod tests {
    use super::ALL_EVENT_NAMES;

    #[test]
    fn event_names_are_pairwise_non_substring() {
        for (i, a) in ALL_EVENT_NAMES.iter().enumerate() {
            for (j, b) in ALL_EVENT_NAMES.iter().enumerate() {
                if i == j {
                    continue;
                }
                assert!(
                    !a.contains(b),
                    "event name {a:?} contains {b:?}; class names must be pairwise non-substring"
                );
            }
        }
    }
}
