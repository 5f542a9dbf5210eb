use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("har io error: {0}")]
    HarIo(String),
    #[error("storage io error: {0}")]
    StorageIo(String),
    #[error("invalid domain pattern {0}: {1}")]
    InvalidPattern(String, String),
}

pub type WatchdogResult<T> = Result<T, WatchdogError>;
