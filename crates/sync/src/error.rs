use thiserror::Error;

use onboard_core::{RecordKey, Section, ValidationError};

/// Failure reported by a [`RecordBackend`](crate::RecordBackend) call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The server refused the request with a 4xx other than 409.
    #[error("rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The server reported a conflicting change (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Network failure, timeout, 5xx or an unreadable reply.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl From<onboard_client::Error> for BackendError {
    fn from(e: onboard_client::Error) -> Self {
        use onboard_client::Error as E;
        match e {
            E::Conflict(message) => Self::Conflict(message),
            E::Http { status, message } | E::Api { status, message, .. }
                if (400..500).contains(&status) =>
            {
                Self::Rejected { status, message }
            }
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Errors surfaced by section sync and submission.
///
/// Every backend failure is converted into one of these before it reaches
/// the caller.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The session token cannot be resolved. Fatal for the session.
    #[error("onboarding link is invalid or has expired: {0}")]
    InvalidSession(String),

    /// A mandatory field or document is missing. Nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The server rejected a write because the record changed remotely.
    /// `message` is the server's text and is meant to be shown as-is.
    #[error("{message}")]
    Conflict {
        /// The conflicting record, or `None` when the conflict concerns the
        /// whole onboarding, as on submit.
        record: Option<RecordKey>,
        message: String,
        /// Every record that failed in the same attempt, `record` included.
        failed: Vec<RecordKey>,
    },

    /// Network or server failure. The draft is preserved and the sync can
    /// be retried.
    #[error("failed to save {}: {message}", join_keys(.failed))]
    TransientNetwork {
        failed: Vec<RecordKey>,
        message: String,
    },

    /// Another sync of the same section is still running.
    #[error("a sync of the {0} section is already in progress")]
    AlreadySyncing(Section),
}

impl SyncError {
    /// Keys of the records whose calls failed.
    pub fn failed_records(&self) -> &[RecordKey] {
        match self {
            Self::Conflict { failed, .. } | Self::TransientNetwork { failed, .. } => failed,
            Self::InvalidSession(_) | Self::Validation(_) | Self::AlreadySyncing(_) => &[],
        }
    }

    /// Returns `true` if retrying the same sync can succeed without the user
    /// changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. } | Self::AlreadySyncing(_))
    }

    /// Convert a failure that happened outside any record call, such as
    /// fetching or submitting.
    pub(crate) fn from_backend(err: BackendError) -> Self {
        match err {
            BackendError::Conflict(message) => Self::Conflict {
                record: None,
                message,
                failed: Vec::new(),
            },
            BackendError::Rejected { message, .. } | BackendError::Unavailable(message) => {
                Self::TransientNetwork {
                    failed: Vec::new(),
                    message,
                }
            }
        }
    }
}

fn join_keys(keys: &[RecordKey]) -> String {
    if keys.is_empty() {
        return "section".to_owned();
    }
    keys.iter()
        .map(RecordKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
