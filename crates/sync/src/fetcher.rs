use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use onboard_core::{Section, SectionRecord, SessionToken, UserId};

use crate::backend::RecordBackend;
use crate::error::{BackendError, SyncError};

/// Resolves the session user once and fetches each section's existing
/// records at most once.
///
/// Successful results are cached for the fetcher's lifetime; failures are
/// not, so a later call can try again.
pub struct RemoteFetcher {
    backend: Arc<dyn RecordBackend>,
    token: SessionToken,
    user: OnceCell<UserId>,
    sections: Mutex<HashMap<Section, Arc<OnceCell<Vec<SectionRecord>>>>>,
}

impl std::fmt::Debug for RemoteFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFetcher")
            .field("token", &self.token)
            .field("user", &self.user.get())
            .finish_non_exhaustive()
    }
}

impl RemoteFetcher {
    pub fn new(backend: Arc<dyn RecordBackend>, token: SessionToken) -> Self {
        Self {
            backend,
            token,
            user: OnceCell::new(),
            sections: Mutex::new(HashMap::new()),
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// The user behind the session token.
    ///
    /// A refused token fails with [`SyncError::InvalidSession`]; a network
    /// failure is reported as transient.
    pub async fn resolve_user_identity(&self) -> Result<UserId, SyncError> {
        let user = self
            .user
            .get_or_try_init(|| async {
                self.backend
                    .resolve_user(&self.token)
                    .await
                    .map_err(|e| match e {
                        BackendError::Rejected { message, .. } => {
                            warn!(error = %message, "session token rejected");
                            SyncError::InvalidSession(message)
                        }
                        other => SyncError::from_backend(other),
                    })
            })
            .await?;
        Ok(user.clone())
    }

    /// Records the user already has for `section`.
    ///
    /// An empty list is the normal first-visit answer. Repeated calls return
    /// the first successful result without touching the network.
    pub async fn fetch_existing(&self, section: Section) -> Result<Vec<SectionRecord>, SyncError> {
        let user = self.resolve_user_identity().await?;
        let cell = Arc::clone(self.sections.lock().entry(section).or_default());

        let records = cell
            .get_or_try_init(|| async {
                let records = self
                    .backend
                    .fetch_records(section, &user)
                    .await
                    .map_err(SyncError::from_backend)?;
                info!(section = %section, count = records.len(), "loaded existing records");
                Ok::<_, SyncError>(records)
            })
            .await?;
        Ok(records.clone())
    }
}
