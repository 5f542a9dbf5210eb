use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomModelError {
    #[error("element not found for highlight index {0}")]
    ElementNotFound(u32),
    #[error("selector map is empty")]
    EmptySelectorMap,
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    #[error("live perception failed: {0}")]
    Perception(String),
}
