use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use onboard_core::{Draft, Section, SessionToken, Snapshot};
use onboard_state::{DraftKey, DraftStore};

/// Typed access to drafts and snapshots on top of a raw [`DraftStore`].
///
/// Every failure of the underlying store is logged and recovered from:
/// reads fall back to the caller's default and writes are dropped. Nothing
/// here ever returns an error.
#[derive(Clone)]
pub struct LocalDraftStore {
    inner: Arc<dyn DraftStore>,
}

impl std::fmt::Debug for LocalDraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDraftStore").finish_non_exhaustive()
    }
}

impl LocalDraftStore {
    pub fn new(inner: Arc<dyn DraftStore>) -> Self {
        Self { inner }
    }

    /// Stored draft for `(token, section)`, or `default` when nothing usable
    /// is stored.
    pub async fn read(&self, token: &SessionToken, section: Section, default: Draft) -> Draft {
        let key = DraftKey::draft(token.clone(), section);
        match self.load::<Draft>(&key).await {
            Some(draft) if draft.section == section => draft,
            Some(draft) => {
                warn!(
                    key = %key,
                    found = %draft.section,
                    "stored draft belongs to another section, ignoring"
                );
                default
            }
            None => default,
        }
    }

    /// Persist a draft. Pending files are stripped first.
    pub async fn write(&self, token: &SessionToken, draft: &Draft) {
        let key = DraftKey::draft(token.clone(), draft.section);
        self.save(&key, &draft.without_pending()).await;
    }

    /// Remove the draft and snapshot of a section.
    pub async fn clear(&self, token: &SessionToken, section: Section) {
        for key in [
            DraftKey::draft(token.clone(), section),
            DraftKey::snapshot(token.clone(), section),
        ] {
            if let Err(e) = self.inner.delete(&key).await {
                warn!(key = %key, error = %e, "failed to clear stored entry");
            }
        }
    }

    /// Remove every section's draft and snapshot for a token.
    pub async fn clear_all(&self, token: &SessionToken) {
        for section in Section::ALL {
            self.clear(token, section).await;
        }
        debug!(token = %token, "cleared all drafts");
    }

    /// Replace local state with a server-sourced draft and persist it right
    /// away. Returns the draft as stored.
    pub async fn hydrate_from_remote(
        &self,
        token: &SessionToken,
        section: Section,
        remote: Draft,
    ) -> Draft {
        let mut draft = remote.without_pending();
        draft.section = section;
        self.write(token, &draft).await;
        draft
    }

    /// Last synced snapshot of a section, if any.
    pub async fn read_snapshot(&self, token: &SessionToken, section: Section) -> Option<Snapshot> {
        let key = DraftKey::snapshot(token.clone(), section);
        self.load::<Snapshot>(&key)
            .await
            .filter(|s| s.section == section)
    }

    pub async fn write_snapshot(&self, token: &SessionToken, snapshot: &Snapshot) {
        let key = DraftKey::snapshot(token.clone(), snapshot.section);
        self.save(&key, snapshot).await;
    }

    async fn load<T: DeserializeOwned>(&self, key: &DraftKey) -> Option<T> {
        let raw = match self.inner.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to read stored entry");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "stored entry is corrupted, using default");
                None
            }
        }
    }

    async fn save<T: Serialize + ?Sized>(&self, key: &DraftKey, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to serialize entry");
                return;
            }
        };
        if let Err(e) = self.inner.set(key, &raw).await {
            warn!(key = %key, error = %e, "failed to persist entry");
        }
    }
}
