use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use onboard_core::{Draft, Section, SectionSchema, SessionToken, Snapshot, SyncOutcome, UserId};
use onboard_state::DraftStore;

use crate::backend::RecordBackend;
use crate::debounce::DebouncedWriter;
use crate::diff::{self, SectionStatus};
use crate::dispatch::SyncDispatcher;
use crate::error::SyncError;
use crate::fetcher::RemoteFetcher;
use crate::merge::merge_remote;
use crate::store::LocalDraftStore;

/// One section as shown before the final submission.
#[derive(Debug, Clone, Serialize)]
pub struct SectionPreview {
    pub section: Section,
    pub draft: Draft,
    pub status: SectionStatus,
}

impl SectionPreview {
    /// Filled in, complete and fully saved.
    pub fn is_ready(&self) -> bool {
        !self.draft.is_empty()
            && self.status.problem.is_none()
            && self.status.diff.is_nothing_to_do()
    }
}

/// Everything one onboarding link needs: the local store, the remote
/// fetcher and the dispatcher, all scoped to a single session token.
pub struct OnboardingSession {
    token: SessionToken,
    backend: Arc<dyn RecordBackend>,
    store: LocalDraftStore,
    fetcher: RemoteFetcher,
    dispatcher: SyncDispatcher,
    opened: Mutex<HashSet<Section>>,
}

impl std::fmt::Debug for OnboardingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnboardingSession")
            .field("token", &self.token)
            .field("fetcher", &self.fetcher)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl OnboardingSession {
    pub fn new(
        token: impl Into<SessionToken>,
        backend: Arc<dyn RecordBackend>,
        store: Arc<dyn DraftStore>,
    ) -> Self {
        let token = token.into();
        let store = LocalDraftStore::new(store);
        Self {
            fetcher: RemoteFetcher::new(Arc::clone(&backend), token.clone()),
            dispatcher: SyncDispatcher::new(Arc::clone(&backend), store.clone(), token.clone()),
            token,
            backend,
            store,
            opened: Mutex::new(HashSet::new()),
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn store(&self) -> &LocalDraftStore {
        &self.store
    }

    /// The user behind the token. Resolved once per session.
    pub async fn user(&self) -> Result<UserId, SyncError> {
        self.fetcher.resolve_user_identity().await
    }

    /// Load a section for editing.
    ///
    /// The first time a section is opened, the server's records are
    /// fetched, stored as the snapshot and merged into the local draft. An
    /// empty local draft is replaced by them outright. Later opens return
    /// the stored draft as is.
    pub async fn open_section(&self, section: Section) -> Result<Draft, SyncError> {
        let remote = self.fetcher.fetch_existing(section).await?;
        let local = self.store.read(&self.token, section, Draft::new(section)).await;
        if !self.opened.lock().insert(section) {
            return Ok(local);
        }

        let draft = if local.is_empty() {
            self.store
                .hydrate_from_remote(
                    &self.token,
                    section,
                    Draft::from_records(section, remote.iter().cloned()),
                )
                .await
        } else {
            let merged = merge_remote(&local, &remote);
            self.store.write(&self.token, &merged).await;
            merged
        };

        self.store
            .write_snapshot(&self.token, &Snapshot::from_records(section, remote))
            .await;
        Ok(draft)
    }

    /// Persist a draft right away.
    pub async fn save_draft(&self, draft: &Draft) {
        self.store.write(&self.token, draft).await;
    }

    /// A writer that persists edits once typing pauses for `delay`.
    pub fn debounced_writer(&self, delay: Duration) -> DebouncedWriter {
        DebouncedWriter::new(self.store.clone(), self.token.clone(), delay)
    }

    /// What a sync of the stored draft would do, without any network call.
    pub async fn status(&self, section: Section, schema: &SectionSchema) -> SectionStatus {
        let draft = self.store.read(&self.token, section, Draft::new(section)).await;
        let snapshot = self
            .store
            .read_snapshot(&self.token, section)
            .await
            .unwrap_or_else(|| Snapshot::empty(section));
        diff::status(&draft, &snapshot, schema)
    }

    /// Every section's stored draft with its status, in wizard order. No
    /// network call is made. Sections without an entry in `schemas` are
    /// checked against an empty schema.
    pub async fn preview(&self, schemas: &[SectionSchema]) -> Vec<SectionPreview> {
        let mut previews = Vec::with_capacity(Section::ALL.len());
        for section in Section::ALL {
            let fallback;
            let schema = match schemas.iter().find(|s| s.section == section) {
                Some(schema) => schema,
                None => {
                    fallback = SectionSchema::new(section);
                    &fallback
                }
            };
            let draft = self.store.read(&self.token, section, Draft::new(section)).await;
            let snapshot = self
                .store
                .read_snapshot(&self.token, section)
                .await
                .unwrap_or_else(|| Snapshot::empty(section));
            let status = diff::status(&draft, &snapshot, schema);
            previews.push(SectionPreview {
                section,
                draft,
                status,
            });
        }
        previews
    }

    /// Sync one section. `draft` receives assigned identifiers and file
    /// paths even when the sync as a whole fails.
    pub async fn sync_section(
        &self,
        draft: &mut Draft,
        schema: &SectionSchema,
    ) -> Result<SyncOutcome, SyncError> {
        let user = self.user().await?;
        self.dispatcher.dispatch(&user, draft, schema).await
    }

    /// Number of syncs in flight.
    pub fn saving(&self) -> watch::Receiver<usize> {
        self.dispatcher.saving()
    }

    /// Final submission. Local drafts are removed only after the server
    /// accepted it.
    pub async fn submit(&self) -> Result<(), SyncError> {
        let user = self.user().await?;
        if let Err(e) = self.backend.submit(&user).await {
            warn!(error = %e, "final submission failed, drafts kept");
            return Err(SyncError::from_backend(e));
        }
        self.store.clear_all(&self.token).await;
        info!(user = %user, "onboarding submitted");
        Ok(())
    }
}
