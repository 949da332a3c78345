use thiserror::Error;

/// Errors that can occur when using the onboarding client.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection error (network failure, DNS resolution, timeout).
    #[error("connection error: {0}")]
    Connection(String),

    /// HTTP error with status code.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// The server rejected a write with 409. The message is shown to the
    /// user as-is.
    #[error("conflict: {0}")]
    Conflict(String),

    /// API error returned by the server.
    #[error("API error [{code}] (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// Whether the request can be retried.
        retryable: bool,
    },

    /// Response deserialization error.
    #[error("failed to deserialize response: {0}")]
    Deserialization(String),

    /// Client configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Returns `true` if this error is retryable.
    ///
    /// Connection errors, HTTP 5xx and API errors flagged retryable return
    /// `true`. Conflicts need user review first and are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Api { retryable, .. } => *retryable,
            Self::Conflict(_) | Self::Deserialization(_) | Self::Configuration(_) => false,
        }
    }

    /// Returns `true` if the server reported a conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// HTTP status the server answered with, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Conflict(_) => Some(409),
            Self::Connection(_) | Self::Deserialization(_) | Self::Configuration(_) => None,
        }
    }
}
