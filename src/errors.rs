//! Top-level error type for the CLI composition root. Wraps every
//! component error behind one `thiserror` enum so `main` has a single
//! `Result` to match on for exit codes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("browser session error: {0}")]
    Session(#[from] browser_session::errors::SessionError),

    #[error("action error: {0}")]
    Action(#[from] action_registry::ActionError),

    #[error(transparent)]
    Agent(#[from] agent_core::AgentError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;
