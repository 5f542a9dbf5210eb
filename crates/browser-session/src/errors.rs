use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error("navigation to {url} blocked: {reason}")]
    NavigationBlocked { url: String, reason: String },
    #[error("navigation to {url} timed out")]
    NavigationTimeout { url: String },
    #[error("tab index {index} out of range (have {count})")]
    TabIndexOutOfRange { index: usize, count: usize },
    #[error("tab {0} not found")]
    TabNotFound(String),
    #[error("session already claimed exclusively by {0}")]
    AlreadyClaimed(String),
    #[error("session is not claimed by {0}")]
    NotOwner(String),
    #[error("element with highlight index {0} not found in current selector map")]
    ElementNotFound(usize),
    #[error("browser driver error: {0}")]
    Driver(String),
    #[error("cdp adapter error: {0}")]
    Adapter(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<cdp_adapter::error::AdapterError> for SessionError {
    fn from(err: cdp_adapter::error::AdapterError) -> Self {
        SessionError::Adapter(err.to_string())
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
