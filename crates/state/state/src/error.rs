use thiserror::Error;

/// Errors from draft store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("storage quota exceeded: {size} bytes exceeds limit of {limit}")]
    QuotaExceeded { size: usize, limit: usize },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StateError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
