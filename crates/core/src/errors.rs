//! Error taxonomy shared by every `foundry-core` subsystem.

use std::path::PathBuf;

use thiserror::Error;

/// The result type returned by nearly every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, FoundryError>;

/// Errors that can escape `foundry-core`.
///
/// Variants map directly onto the outcomes a `Context`, `Service`, or
/// `BuildPipeline` can produce: a thing wasn't there, a thing is declining to
/// act, an in-flight operation was cancelled, or the `Context` is on its way
/// down and no longer accepts new work.
#[derive(Debug, Error)]
pub enum FoundryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not supported")]
    NotSupported,

    #[error("operation was cancelled")]
    Cancelled,

    #[error("context is shutting down")]
    InShutdown,

    #[error("object has been disposed")]
    Disposed,

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("invalid data: {message}")]
    InvalidData { message: String },

    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FoundryError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        FoundryError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        FoundryError::InvalidData {
            message: message.into(),
        }
    }

    /// True for errors an `Intent` dispatch or extension-point lookup should
    /// treat as "try the next handler" rather than "stop and report."
    pub fn is_not_supported(&self) -> bool {
        matches!(self, FoundryError::NotSupported)
    }
}
