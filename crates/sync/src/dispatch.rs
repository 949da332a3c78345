//! Turning a section diff into create and update calls.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};

use onboard_client::RemoteAck;
use onboard_core::{
    Attachment, Classification, Draft, RecordKey, RemoteId, Section, SectionRecord,
    SectionSchema, SessionToken, Snapshot, SyncOutcome, SyncReport, UserId,
};

use crate::backend::RecordBackend;
use crate::diff::{self, effective_remote_id, snapshot_remote_id};
use crate::error::{BackendError, SyncError};
use crate::store::LocalDraftStore;

/// Executes section syncs for one session.
///
/// The whole section moves forward together: the snapshot is replaced only
/// when every call of an attempt succeeded. Identifiers assigned by the
/// calls that did succeed are still kept in the draft, so a retry updates
/// those records instead of creating them twice.
pub struct SyncDispatcher {
    backend: Arc<dyn RecordBackend>,
    store: LocalDraftStore,
    token: SessionToken,
    in_flight: Mutex<HashSet<Section>>,
    saving: watch::Sender<usize>,
}

impl std::fmt::Debug for SyncDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncDispatcher")
            .field("token", &self.token)
            .field("in_flight", &*self.in_flight.lock())
            .finish_non_exhaustive()
    }
}

/// Marks a section as syncing until dropped.
struct SectionGuard<'a> {
    in_flight: &'a Mutex<HashSet<Section>>,
    section: Section,
}

impl Drop for SectionGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.section);
    }
}

/// Counts one dispatch on the saving channel until dropped.
struct SavingGuard<'a>(&'a watch::Sender<usize>);

impl<'a> SavingGuard<'a> {
    fn new(tx: &'a watch::Sender<usize>) -> Self {
        tx.send_modify(|n| *n += 1);
        Self(tx)
    }
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

enum Call {
    Create,
    Update(RemoteId),
}

impl SyncDispatcher {
    pub fn new(
        backend: Arc<dyn RecordBackend>,
        store: LocalDraftStore,
        token: SessionToken,
    ) -> Self {
        let (saving, _) = watch::channel(0);
        Self {
            backend,
            store,
            token,
            in_flight: Mutex::new(HashSet::new()),
            saving,
        }
    }

    /// Number of dispatches currently talking to the backend. Non-zero means
    /// a blocking "saving" indicator should be shown.
    pub fn saving(&self) -> watch::Receiver<usize> {
        self.saving.subscribe()
    }

    /// Returns `true` if a sync of `section` is running.
    pub fn is_syncing(&self, section: Section) -> bool {
        self.in_flight.lock().contains(&section)
    }

    fn enter(&self, section: Section) -> Result<SectionGuard<'_>, SyncError> {
        if !self.in_flight.lock().insert(section) {
            return Err(SyncError::AlreadySyncing(section));
        }
        Ok(SectionGuard {
            in_flight: &self.in_flight,
            section,
        })
    }

    /// Sync one section of `user`.
    ///
    /// Validates, issues one call per new or changed record (concurrently),
    /// folds identifiers and file paths back into `draft`, refreshes mirror
    /// records from their sources and persists. The snapshot is replaced
    /// only when every call succeeded.
    pub async fn dispatch(
        &self,
        user: &UserId,
        draft: &mut Draft,
        schema: &SectionSchema,
    ) -> Result<SyncOutcome, SyncError> {
        let section = draft.section;
        let _guard = self.enter(section)?;

        let snapshot = self
            .store
            .read_snapshot(&self.token, section)
            .await
            .unwrap_or_else(|| Snapshot::empty(section));
        let diff = diff::diff(draft, &snapshot, schema)?;
        adopt_known_ids(draft, &snapshot);

        let mut report = SyncReport::new(section);
        report.unchanged = diff.keys_with(Classification::Unchanged);

        if diff.is_nothing_to_do() {
            refresh_mirrors(draft);
            self.store.write(&self.token, draft).await;
            info!(section = %section, "nothing to sync");
            return Ok(SyncOutcome::NothingToDo { section });
        }

        let current: &Draft = draft;
        let planned: Vec<(SectionRecord, Call)> = diff
            .needing_calls()
            .filter_map(|key| {
                let record = current.record(key)?.clone();
                let call = match effective_remote_id(current, &snapshot, key) {
                    Some(id) => Call::Update(id.clone()),
                    None => Call::Create,
                };
                Some((record, call))
            })
            .collect();

        let results = {
            let _saving = SavingGuard::new(&self.saving);
            join_all(planned.iter().map(|(record, call)| async move {
                match call {
                    Call::Create => self.backend.create_record(section, user, record).await,
                    Call::Update(id) => {
                        self.backend.update_record(section, user, id, record).await
                    }
                }
            }))
            .await
        };

        let mut failures: Vec<(RecordKey, BackendError)> = Vec::new();
        for ((sent, call), result) in planned.iter().zip(results) {
            match result {
                Ok(ack) => {
                    let assigned = match call {
                        Call::Create => {
                            report.created.push(sent.key.clone());
                            ack.id.clone()
                        }
                        Call::Update(id) => {
                            report.updated.push(sent.key.clone());
                            Some(id.clone())
                        }
                    };
                    fold_ack(draft, sent, assigned, &ack);
                }
                Err(e) => {
                    warn!(section = %section, record = %sent.key, error = %e, "record sync failed");
                    failures.push((sent.key.clone(), e));
                }
            }
        }

        report.mirrored = refresh_mirrors(draft);
        self.store.write(&self.token, draft).await;

        if !failures.is_empty() {
            return Err(section_failure(failures));
        }

        let mut next = Snapshot::of_draft(draft);
        for key in diff.keys_with(Classification::Removed) {
            if let Some(kept) = snapshot.records.get(&key) {
                next.records.insert(key, kept.clone());
            }
        }
        self.store.write_snapshot(&self.token, &next).await;

        info!(
            section = %section,
            created = report.created.len(),
            updated = report.updated.len(),
            mirrored = report.mirrored.len(),
            "section synced"
        );
        Ok(SyncOutcome::Synced(report))
    }
}

/// Apply a successful reply to the draft record it was sent for.
///
/// Files the reply assigned a path to are marked stored. Pending files
/// without a returned path stay pending.
fn fold_ack(draft: &mut Draft, sent: &SectionRecord, assigned: Option<RemoteId>, ack: &RemoteAck) {
    let Some(record) = draft.records.get_mut(&sent.key) else {
        return;
    };
    if assigned.is_some() {
        record.remote_id = assigned;
    }
    for (slot, path) in &ack.files {
        match record.attachments.get_mut(slot) {
            Some(attachment) => attachment.mark_stored(path.clone()),
            None => {
                record
                    .attachments
                    .insert(slot.clone(), Attachment::stored(slot, path));
            }
        }
    }
}

/// Give draft records the identifier the snapshot already knows for them.
fn adopt_known_ids(draft: &mut Draft, snapshot: &Snapshot) {
    for (key, record) in &mut draft.records {
        if record.remote_id.is_some() || record.mirror_of.is_some() {
            continue;
        }
        if let Some(known) = snapshot_remote_id(snapshot, key) {
            record.remote_id = Some(known.clone());
        }
    }
}

/// Copy every mirror record's source into it. Returns the refreshed keys.
fn refresh_mirrors(draft: &mut Draft) -> Vec<RecordKey> {
    let links: Vec<(RecordKey, RecordKey)> = draft
        .records
        .values()
        .filter_map(|r| Some((r.key.clone(), r.mirror_of.clone()?)))
        .collect();

    let mut refreshed = Vec::new();
    for (key, source_key) in links {
        let Some(source) = draft.record(&source_key).cloned() else {
            warn!(record = %key, source = %source_key, "mirror source missing");
            continue;
        };
        if let Some(mirror) = draft.records.get_mut(&key) {
            mirror.mirror_from(&source);
            refreshed.push(key);
        }
    }
    refreshed
}

/// Collapse per-record failures into one section error. A conflict wins
/// over transient failures since the user has to act on it.
fn section_failure(failures: Vec<(RecordKey, BackendError)>) -> SyncError {
    let failed: Vec<RecordKey> = failures.iter().map(|(k, _)| k.clone()).collect();

    if let Some((record, message)) = failures.iter().find_map(|(k, e)| match e {
        BackendError::Conflict(m) => Some((k.clone(), m.clone())),
        BackendError::Rejected { .. } | BackendError::Unavailable(_) => None,
    }) {
        return SyncError::Conflict {
            record: Some(record),
            message,
            failed,
        };
    }

    let message = failures
        .into_iter()
        .next()
        .map(|(_, e)| e.to_string())
        .unwrap_or_default();
    SyncError::TransientNetwork { failed, message }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use onboard_core::schema::{PERMANENT_ADDRESS, TEMPORARY_ADDRESS};
    use onboard_core::{FieldValue, PendingFile};
    use onboard_state_memory::MemoryDraftStore;

    use super::*;
    use crate::testing::{BackendCall, FailureMode, RecordingBackend};

    fn address(city: &str) -> SectionRecord {
        SectionRecord::new(PERMANENT_ADDRESS)
            .with_field("address_line1", "1 MG Road")
            .with_field("city", city)
            .with_field("district_or_ward", "Shivajinagar")
            .with_field("state_or_region", "Maharashtra")
            .with_field("postal_code", "411005")
            .with_field("country_uuid", "in")
    }

    fn setup(
        backend: RecordingBackend,
    ) -> (Arc<RecordingBackend>, SyncDispatcher, LocalDraftStore) {
        let backend = Arc::new(backend);
        let store = LocalDraftStore::new(Arc::new(MemoryDraftStore::new()));
        let dispatcher = SyncDispatcher::new(backend.clone(), store.clone(), "tok".into());
        (backend, dispatcher, store)
    }

    fn user() -> UserId {
        UserId::new("user-1")
    }

    #[tokio::test]
    async fn unchanged_draft_makes_no_calls() {
        let (backend, dispatcher, store) = setup(RecordingBackend::new());
        let synced = address("Pune").with_remote_id("addr-1");
        store
            .write_snapshot(
                &"tok".into(),
                &Snapshot::from_records(Section::Address, [synced.clone()]),
            )
            .await;

        let mut draft = Draft::from_records(Section::Address, [synced]);
        let outcome = dispatcher
            .dispatch(&user(), &mut draft, &SectionSchema::address())
            .await
            .unwrap();
        assert!(outcome.is_nothing_to_do());
        assert_eq!(outcome.message(), "No changes to save");
        backend.assert_writes(0);
    }

    #[tokio::test]
    async fn pune_to_mumbai_issues_one_update() {
        let (backend, dispatcher, store) = setup(RecordingBackend::new());
        let token = SessionToken::new("tok");
        store
            .write_snapshot(
                &token,
                &Snapshot::from_records(
                    Section::Address,
                    [address("Pune").with_remote_id("addr-1")],
                ),
            )
            .await;

        let mut draft =
            Draft::from_records(Section::Address, [address("Mumbai").with_remote_id("addr-1")]);
        let outcome = dispatcher
            .dispatch(&user(), &mut draft, &SectionSchema::address())
            .await
            .unwrap();

        backend.assert_writes(1);
        match &backend.writes()[0] {
            BackendCall::Update { remote_id, record, .. } => {
                assert_eq!(remote_id.as_str(), "addr-1");
                assert_eq!(record.field("city"), &FieldValue::text("Mumbai"));
            }
            other => panic!("expected update, got {other:?}"),
        }
        let SyncOutcome::Synced(report) = outcome else {
            panic!("expected a synced outcome");
        };
        assert_eq!(report.updated, vec![RecordKey::new(PERMANENT_ADDRESS)]);

        let snapshot = store.read_snapshot(&token, Section::Address).await.unwrap();
        assert_eq!(
            snapshot.record(PERMANENT_ADDRESS).unwrap().field("city"),
            &FieldValue::text("Mumbai")
        );
    }

    #[tokio::test]
    async fn record_without_remote_id_is_never_updated() {
        let (backend, dispatcher, store) = setup(RecordingBackend::new());
        // The snapshot knows the record but not its id.
        store
            .write_snapshot(
                &"tok".into(),
                &Snapshot::from_records(Section::Address, [address("Pune")]),
            )
            .await;

        let mut draft = Draft::from_records(Section::Address, [address("Mumbai")]);
        dispatcher
            .dispatch(&user(), &mut draft, &SectionSchema::address())
            .await
            .unwrap();

        assert_eq!(backend.count(|c| matches!(c, BackendCall::Update { .. })), 0);
        assert_eq!(backend.count(|c| matches!(c, BackendCall::Create { .. })), 1);
        assert!(draft.record(PERMANENT_ADDRESS).unwrap().remote_id.is_some());
    }

    #[tokio::test]
    async fn mirror_gets_the_assigned_id_without_a_call() {
        let (backend, dispatcher, store) = setup(RecordingBackend::new());
        let mut draft = Draft::from_records(Section::Address, [address("Pune")]);
        draft.set_mirror(TEMPORARY_ADDRESS, Some(PERMANENT_ADDRESS.into()));

        let outcome = dispatcher
            .dispatch(&user(), &mut draft, &SectionSchema::address())
            .await
            .unwrap();

        backend.assert_writes(1);
        assert_eq!(backend.writes()[0].record_key(), Some(PERMANENT_ADDRESS));
        let permanent = draft.record(PERMANENT_ADDRESS).unwrap();
        let temporary = draft.record(TEMPORARY_ADDRESS).unwrap();
        assert!(permanent.remote_id.is_some());
        assert_eq!(temporary.remote_id, permanent.remote_id);
        assert_eq!(temporary.field("city"), &FieldValue::text("Pune"));

        let SyncOutcome::Synced(report) = outcome else {
            panic!("expected a synced outcome");
        };
        assert_eq!(report.mirrored, vec![RecordKey::new(TEMPORARY_ADDRESS)]);

        // A second sync has nothing to do.
        let again = dispatcher
            .dispatch(&user(), &mut draft, &SectionSchema::address())
            .await
            .unwrap();
        assert!(again.is_nothing_to_do());
        backend.assert_writes(1);
        assert!(store.read_snapshot(&"tok".into(), Section::Address).await.is_some());
    }

    #[tokio::test]
    async fn detached_copy_is_created_as_its_own_record() {
        let (backend, dispatcher, _) = setup(RecordingBackend::new());
        let mut draft = Draft::from_records(Section::Address, [address("Pune")]);
        draft.set_mirror(TEMPORARY_ADDRESS, Some(PERMANENT_ADDRESS.into()));
        dispatcher
            .dispatch(&user(), &mut draft, &SectionSchema::address())
            .await
            .unwrap();
        let permanent_id = draft.record(PERMANENT_ADDRESS).unwrap().remote_id.clone();
        backend.clear();

        draft.set_mirror(TEMPORARY_ADDRESS, None);
        draft.set_field(TEMPORARY_ADDRESS, "city", "Goa");
        let outcome = dispatcher
            .dispatch(&user(), &mut draft, &SectionSchema::address())
            .await
            .unwrap();

        backend.assert_writes(1);
        match &backend.writes()[0] {
            BackendCall::Create { record, .. } => {
                assert_eq!(record.key.as_str(), TEMPORARY_ADDRESS);
                assert_eq!(record.field("city"), &FieldValue::text("Goa"));
            }
            other => panic!("expected a create, got {other:?}"),
        }
        let SyncOutcome::Synced(report) = outcome else {
            panic!("expected a synced outcome");
        };
        assert_eq!(report.created, vec![RecordKey::new(TEMPORARY_ADDRESS)]);
        assert_eq!(report.unchanged, vec![RecordKey::new(PERMANENT_ADDRESS)]);

        let temporary = draft.record(TEMPORARY_ADDRESS).unwrap();
        assert!(temporary.remote_id.is_some());
        assert_ne!(temporary.remote_id, permanent_id);
        assert_eq!(draft.record(PERMANENT_ADDRESS).unwrap().remote_id, permanent_id);
    }

    #[tokio::test]
    async fn missing_slot_blocks_before_any_call() {
        let (backend, dispatcher, _) = setup(RecordingBackend::new());
        let schema = SectionSchema::new(Section::Identity)
            .require_fields(["identity_file_number"])
            .require_slots(["passport_scan"])
            .require_record("passport");
        let mut draft = Draft::from_records(
            Section::Identity,
            [SectionRecord::new("passport").with_field("identity_file_number", "Z1234567")],
        );

        let err = dispatcher
            .dispatch(&user(), &mut draft, &schema)
            .await
            .unwrap_err();
        match err {
            SyncError::Validation(v) => {
                assert_eq!(v.record.as_str(), "passport");
                assert_eq!(v.missing_name(), "passport_scan");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn n_records_make_exactly_n_calls() {
        let (backend, dispatcher, _) = setup(RecordingBackend::new());
        let schema = SectionSchema::experience();
        let jobs = (1..=3).map(|i| {
            SectionRecord::new(format!("job-{i}"))
                .with_field("company_name", format!("Company {i}"))
                .with_field("role_title", "Engineer")
                .with_field("start_date", "2020-01-01")
                .with_field("end_date", "2021-01-01")
                .with_field("employment_type", "Part-Time")
                .with_field("remarks", "none")
        });
        let mut draft = Draft::from_records(Section::Experience, jobs);
        for i in 1..=3 {
            draft.attach(
                format!("job-{i}"),
                "exp_certificate_path",
                PendingFile::new(format!("cert-{i}.pdf"), "application/pdf", vec![1u8]),
            );
        }

        dispatcher.dispatch(&user(), &mut draft, &schema).await.unwrap();
        backend.assert_writes(3);

        for record in draft.records.values() {
            let cert = &record.attachments["exp_certificate_path"];
            assert!(!cert.is_pending());
            assert!(cert.server_path.as_deref().unwrap().ends_with(".pdf"));
        }
    }

    #[tokio::test]
    async fn partial_failure_keeps_snapshot_and_retries_all() {
        let (backend, dispatcher, store) = setup(RecordingBackend::new());
        let token = SessionToken::new("tok");
        let schema = SectionSchema::new(Section::Education).require_fields(["institution_name"]);
        let mut draft = Draft::from_records(
            Section::Education,
            ["10th", "12th", "Bachelor's Degree"].map(|level| {
                SectionRecord::new(level).with_field("institution_name", format!("{level} school"))
            }),
        );
        backend.fail_record("12th", FailureMode::Transient);

        let err = dispatcher
            .dispatch(&user(), &mut draft, &schema)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::TransientNetwork { .. }));
        assert_eq!(err.failed_records(), &[RecordKey::new("12th")]);
        assert!(store.read_snapshot(&token, Section::Education).await.is_none());

        // Identifiers of the successful creates are kept in the draft.
        assert!(draft.record("10th").unwrap().remote_id.is_some());
        assert!(draft.record("12th").unwrap().remote_id.is_none());
        let persisted = store
            .read(&token, Section::Education, Draft::new(Section::Education))
            .await;
        assert!(persisted.record("Bachelor's Degree").unwrap().remote_id.is_some());

        backend.heal();
        backend.clear();
        dispatcher.dispatch(&user(), &mut draft, &schema).await.unwrap();

        backend.assert_writes(3);
        assert_eq!(backend.count(|c| matches!(c, BackendCall::Update { .. })), 2);
        assert_eq!(backend.count(|c| matches!(c, BackendCall::Create { .. })), 1);
        let snapshot = store.read_snapshot(&token, Section::Education).await.unwrap();
        assert_eq!(snapshot.records.len(), 3);
    }

    #[tokio::test]
    async fn conflict_message_is_surfaced() {
        let (backend, dispatcher, _) = setup(RecordingBackend::new());
        backend.fail_record(
            PERMANENT_ADDRESS,
            FailureMode::Conflict("Address was verified by HR and cannot change".into()),
        );
        let mut draft = Draft::from_records(Section::Address, [address("Pune")]);

        let err = dispatcher
            .dispatch(&user(), &mut draft, &SectionSchema::address())
            .await
            .unwrap_err();
        match err {
            SyncError::Conflict { record, message, .. } => {
                assert_eq!(record.as_ref().map(RecordKey::as_str), Some(PERMANENT_ADDRESS));
                assert_eq!(message, "Address was verified by HR and cannot change");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn removed_records_stay_in_snapshot() {
        let (backend, dispatcher, store) = setup(RecordingBackend::new());
        let token = SessionToken::new("tok");
        let schema = SectionSchema::new(Section::Experience);
        store
            .write_snapshot(
                &token,
                &Snapshot::from_records(
                    Section::Experience,
                    [
                        SectionRecord::new("old-job")
                            .with_remote_id("x-1")
                            .with_field("company_name", "Old"),
                        SectionRecord::new("job")
                            .with_remote_id("x-2")
                            .with_field("company_name", "A"),
                    ],
                ),
            )
            .await;
        let mut draft = Draft::from_records(
            Section::Experience,
            [SectionRecord::new("job").with_remote_id("x-2").with_field("company_name", "B")],
        );

        dispatcher.dispatch(&user(), &mut draft, &schema).await.unwrap();
        backend.assert_writes(1);
        let snapshot = store.read_snapshot(&token, Section::Experience).await.unwrap();
        assert!(snapshot.record("old-job").is_some());
        assert_eq!(
            snapshot.record("job").unwrap().field("company_name"),
            &FieldValue::text("B")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_sync_of_same_section_is_rejected() {
        let (backend, dispatcher, _) =
            setup(RecordingBackend::new().with_delay(Duration::from_millis(500)));
        let dispatcher = Arc::new(dispatcher);
        let mut saving = dispatcher.saving();
        assert_eq!(*saving.borrow(), 0);

        let first = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                let mut draft = Draft::from_records(Section::Address, [address("Pune")]);
                dispatcher
                    .dispatch(&user(), &mut draft, &SectionSchema::address())
                    .await
            })
        };

        saving.changed().await.unwrap();
        assert_eq!(*saving.borrow_and_update(), 1);
        assert!(dispatcher.is_syncing(Section::Address));

        let mut second = Draft::from_records(Section::Address, [address("Goa")]);
        let err = dispatcher
            .dispatch(&user(), &mut second, &SectionSchema::address())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::AlreadySyncing(Section::Address)));

        first.await.unwrap().unwrap();
        assert_eq!(*dispatcher.saving().borrow(), 0);
        assert!(!dispatcher.is_syncing(Section::Address));
        backend.assert_writes(1);
    }
}
