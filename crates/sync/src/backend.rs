use async_trait::async_trait;

use onboard_client::{OnboardClient, RemoteAck};
use onboard_core::schema::PERSONAL_RECORD;
use onboard_core::{RemoteId, Section, SectionRecord, SessionToken, UserId};

use crate::error::BackendError;

/// Remote side of the synchronizer.
///
/// [`OnboardClient`] is the production implementation; tests use
/// [`RecordingBackend`](crate::testing::RecordingBackend).
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Resolve a session token to the user it belongs to.
    async fn resolve_user(&self, token: &SessionToken) -> Result<UserId, BackendError>;

    /// Records the user already has for a section. Empty when none exist.
    async fn fetch_records(
        &self,
        section: Section,
        user: &UserId,
    ) -> Result<Vec<SectionRecord>, BackendError>;

    /// Create a record; the reply carries the assigned identifier.
    async fn create_record(
        &self,
        section: Section,
        user: &UserId,
        record: &SectionRecord,
    ) -> Result<RemoteAck, BackendError>;

    /// Update an existing record.
    async fn update_record(
        &self,
        section: Section,
        user: &UserId,
        remote_id: &RemoteId,
        record: &SectionRecord,
    ) -> Result<RemoteAck, BackendError>;

    /// Final submission of the whole onboarding.
    async fn submit(&self, user: &UserId) -> Result<(), BackendError>;
}

/// Key given to fetched records the service returns without one.
fn fallback_key(section: Section) -> Option<&'static str> {
    match section {
        Section::Personal => Some(PERSONAL_RECORD),
        Section::Address | Section::Identity | Section::Education | Section::Experience => None,
    }
}

#[async_trait]
impl RecordBackend for OnboardClient {
    async fn resolve_user(&self, token: &SessionToken) -> Result<UserId, BackendError> {
        Ok(self.verify_token(token).await?)
    }

    async fn fetch_records(
        &self,
        section: Section,
        user: &UserId,
    ) -> Result<Vec<SectionRecord>, BackendError> {
        let remote = OnboardClient::fetch_records(self, section, user).await?;
        let key = fallback_key(section);
        Ok(remote
            .into_iter()
            .map(|r| r.into_section_record(key))
            .collect())
    }

    async fn create_record(
        &self,
        section: Section,
        user: &UserId,
        record: &SectionRecord,
    ) -> Result<RemoteAck, BackendError> {
        Ok(OnboardClient::create_record(self, section, user, record).await?)
    }

    async fn update_record(
        &self,
        section: Section,
        user: &UserId,
        remote_id: &RemoteId,
        record: &SectionRecord,
    ) -> Result<RemoteAck, BackendError> {
        Ok(OnboardClient::update_record(self, section, user, remote_id, record).await?)
    }

    async fn submit(&self, user: &UserId) -> Result<(), BackendError> {
        Ok(OnboardClient::submit(self, user).await?)
    }
}
