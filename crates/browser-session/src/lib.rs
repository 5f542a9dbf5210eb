//! Browser Session: the stateful façade over a CDP driver (tabs,
//! navigation history, downloads, ownership, DOM snapshots) that the
//! agent step loop and watchdogs operate on.

pub mod cdp_tree;
pub mod downloads;
pub mod errors;
pub mod events;
pub mod ownership;
pub mod session;
pub mod types;

pub use downloads::{dedup_key, is_attachment_download, looks_like_pdf, sanitize_filename, DownloadedFiles};
pub use errors::{SessionError, SessionResult};
pub use events::{BrowserErrorKind, BrowserEvent, DownloadState, NavigateWaitUntil, ALL_EVENT_NAMES};
pub use ownership::OwnershipGuard;
pub use session::{normalize_url, BrowserSession, NavigateOptions, SessionConfig};
pub use types::{
    BrowserStateSummary, DownloadedFile, OwnerMode, PageInfo, PendingNetworkRequest, TabInfo,
};
