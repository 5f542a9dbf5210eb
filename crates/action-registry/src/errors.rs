//! Error types for action registration and execution.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ActionError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("parameter validation failed for {action}: {reason}")]
    Validation { action: String, reason: String },

    #[error("domain not allowed: {url} does not match {patterns:?}")]
    DomainDenied { url: String, patterns: Vec<String> },

    #[error("element with highlight index {0} not found")]
    ElementNotFound(u32),

    #[error("element not clickable: {0}")]
    NotClickable(String),

    #[error("dropdown option not found: {0}")]
    OptionNotFound(String),

    #[error("file system error: {0}")]
    FileSystem(String),

    #[error("path {0} escapes the sandboxed file-system root")]
    SandboxEscape(String),

    #[error("file extension not allowed: {0}")]
    ExtensionNotAllowed(String),

    #[error("browser session error: {0}")]
    Session(String),

    #[error("extraction LLM unavailable")]
    NoExtractionLlm,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<browser_session::SessionError> for ActionError {
    fn from(err: browser_session::SessionError) -> Self {
        ActionError::Session(err.to_string())
    }
}

pub type ActionOutcome<T> = Result<T, ActionError>;
