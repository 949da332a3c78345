//! Test backends for exercising the synchronizer without a server.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use onboard_client::RemoteAck;
use onboard_core::{
    Attachment, RecordKey, RemoteId, Section, SectionRecord, SessionToken, UserId,
};

use crate::backend::RecordBackend;
use crate::error::BackendError;

/// A call received by [`RecordingBackend`].
#[derive(Debug, Clone)]
pub enum BackendCall {
    ResolveUser(SessionToken),
    Fetch(Section),
    Create {
        section: Section,
        record: SectionRecord,
    },
    Update {
        section: Section,
        remote_id: RemoteId,
        record: SectionRecord,
    },
    Submit(UserId),
}

impl BackendCall {
    /// Key of the record a create or update carried.
    pub fn record_key(&self) -> Option<&str> {
        match self {
            Self::Create { record, .. } | Self::Update { record, .. } => Some(record.key.as_str()),
            Self::ResolveUser(_) | Self::Fetch(_) | Self::Submit(_) => None,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::Create { .. } | Self::Update { .. })
    }
}

/// How a write to a given record should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureMode {
    /// Behave like a timeout or a 5xx.
    Transient,
    /// Answer 409 with this message.
    Conflict(String),
}

/// In-memory stand-in for the onboarding service.
///
/// Records every call, keeps created records so later fetches see them and
/// fails writes for selected records on demand.
pub struct RecordingBackend {
    users: Mutex<HashMap<SessionToken, UserId>>,
    remote: Mutex<HashMap<Section, BTreeMap<RecordKey, SectionRecord>>>,
    calls: Arc<Mutex<Vec<BackendCall>>>,
    failures: Mutex<HashMap<RecordKey, FailureMode>>,
    fail_submit: Mutex<bool>,
    next_id: AtomicUsize,
    delay: Option<Duration>,
}

impl std::fmt::Debug for RecordingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingBackend")
            .field("call_count", &self.calls.lock().len())
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            remote: Mutex::new(HashMap::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Mutex::new(HashMap::new()),
            fail_submit: Mutex::new(false),
            next_id: AtomicUsize::new(1),
            delay: None,
        }
    }

    /// Accept `token` as belonging to `user`.
    #[must_use]
    pub fn with_user(self, token: &str, user: &str) -> Self {
        self.users.lock().insert(token.into(), user.into());
        self
    }

    /// Seed records the user already has for a section.
    #[must_use]
    pub fn with_remote(
        self,
        section: Section,
        records: impl IntoIterator<Item = SectionRecord>,
    ) -> Self {
        {
            let mut remote = self.remote.lock();
            let stored = remote.entry(section).or_default();
            for record in records {
                stored.insert(record.key.clone(), record.without_pending());
            }
        }
        self
    }

    /// Delay every write by `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make writes to `key` fail until [`heal`](Self::heal) is called.
    pub fn fail_record(&self, key: &str, mode: FailureMode) {
        self.failures.lock().insert(key.into(), mode);
    }

    /// Let writes to every record succeed again.
    pub fn heal(&self) {
        self.failures.lock().clear();
    }

    pub fn set_fail_submit(&self, fail: bool) {
        *self.fail_submit.lock() = fail;
    }

    /// Get all received calls.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Only the create and update calls.
    pub fn writes(&self) -> Vec<BackendCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    /// Number of calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    /// Clear all captured calls. Stored records are kept.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Assert that exactly `n` creates or updates were received.
    ///
    /// # Panics
    ///
    /// Panics if the number of writes differs.
    pub fn assert_writes(&self, n: usize) {
        let writes = self.writes();
        assert_eq!(
            writes.len(),
            n,
            "expected {n} writes, got {}: {writes:#?}",
            writes.len()
        );
    }

    /// Record as the server currently holds it.
    pub fn remote_record(&self, section: Section, key: &str) -> Option<SectionRecord> {
        self.remote
            .lock()
            .get(&section)
            .and_then(|records| records.get(key).cloned())
    }

    fn record_call(&self, call: BackendCall) {
        self.calls.lock().push(call);
    }

    fn check_failure(&self, key: &RecordKey) -> Result<(), BackendError> {
        match self.failures.lock().get(key) {
            None => Ok(()),
            Some(FailureMode::Transient) => Err(BackendError::Unavailable(format!(
                "simulated timeout saving {key}"
            ))),
            Some(FailureMode::Conflict(message)) => Err(BackendError::Conflict(message.clone())),
        }
    }

    /// Store the record server-side and report paths for uploaded files.
    fn store(
        &self,
        section: Section,
        user: &UserId,
        id: RemoteId,
        record: &SectionRecord,
    ) -> BTreeMap<String, String> {
        let mut files = BTreeMap::new();
        let mut stored = record.without_pending();
        stored.remote_id = Some(id);
        for attachment in record.attachments.values() {
            if let Some(file) = &attachment.pending {
                let path = format!(
                    "/files/{user}/{section}/{}/{}",
                    record.key, file.file_name
                );
                stored
                    .attachments
                    .insert(attachment.slot.clone(), Attachment::stored(&attachment.slot, &path));
                files.insert(attachment.slot.clone(), path);
            }
        }
        self.remote
            .lock()
            .entry(section)
            .or_default()
            .insert(record.key.clone(), stored);
        files
    }
}

#[async_trait]
impl RecordBackend for RecordingBackend {
    async fn resolve_user(&self, token: &SessionToken) -> Result<UserId, BackendError> {
        self.record_call(BackendCall::ResolveUser(token.clone()));
        self.users
            .lock()
            .get(token)
            .cloned()
            .ok_or_else(|| BackendError::Rejected {
                status: 401,
                message: "invalid or expired token".into(),
            })
    }

    async fn fetch_records(
        &self,
        section: Section,
        _user: &UserId,
    ) -> Result<Vec<SectionRecord>, BackendError> {
        self.record_call(BackendCall::Fetch(section));
        Ok(self
            .remote
            .lock()
            .get(&section)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_record(
        &self,
        section: Section,
        user: &UserId,
        record: &SectionRecord,
    ) -> Result<RemoteAck, BackendError> {
        self.record_call(BackendCall::Create {
            section,
            record: record.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failure(&record.key)?;

        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = RemoteId::new(format!("{section}-{n}"));
        let files = self.store(section, user, id.clone(), record);
        Ok(RemoteAck {
            id: Some(id),
            files,
        })
    }

    async fn update_record(
        &self,
        section: Section,
        user: &UserId,
        remote_id: &RemoteId,
        record: &SectionRecord,
    ) -> Result<RemoteAck, BackendError> {
        self.record_call(BackendCall::Update {
            section,
            remote_id: remote_id.clone(),
            record: record.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failure(&record.key)?;

        let files = self.store(section, user, remote_id.clone(), record);
        Ok(RemoteAck { id: None, files })
    }

    async fn submit(&self, user: &UserId) -> Result<(), BackendError> {
        self.record_call(BackendCall::Submit(user.clone()));
        if *self.fail_submit.lock() {
            return Err(BackendError::Unavailable("simulated submit failure".into()));
        }
        Ok(())
    }
}
