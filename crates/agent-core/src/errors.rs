use thiserror::Error;

/// Errors emitted by the agent-core crate. Mirrors the taxonomy in
/// spec §7: invalid input is a validation error, everything to do
/// with calling out to the model is transient-remote or fatal.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Raised when an agent request is malformed or missing required fields.
    #[error("invalid agent request: {0}")]
    InvalidRequest(String),

    /// Raised when the model's completion could not be parsed into an
    /// `AgentOutput` (step 4 of the step algorithm, §4.6).
    #[error("failed to parse model output: {0}")]
    Parse(String),

    /// Rate limit / 5xx / network reset from the chat model; retryable
    /// with backoff up to `llm_max_retries` (§4.6).
    #[error("transient model error: {0}")]
    Transient(String),

    /// Non-retryable failure from the chat model.
    #[error("model provider error: {0}")]
    Provider(String),

    /// The agent (or its containing session) was cancelled mid-step.
    #[error("agent run cancelled")]
    Cancelled,
}

impl AgentError {
    /// Helper for wrapping static string errors.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    /// Whether this error class should be retried with backoff (§4.6).
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::Transient(_))
    }
}
