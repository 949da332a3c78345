use async_trait::async_trait;
use dashmap::DashMap;

use onboard_state::error::StateError;
use onboard_state::key::DraftKey;
use onboard_state::store::DraftStore;

/// In-memory [`DraftStore`] backed by a [`DashMap`].
///
/// An optional per-value quota mimics the size limit of browser storage:
/// oversized writes fail with [`StateError::QuotaExceeded`] and leave the
/// previous value in place.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    data: DashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryDraftStore {
    /// Create a new, empty in-memory draft store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects values larger than `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            data: DashMap::new(),
            quota: Some(bytes),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Store a raw value without any checks. Used by tests to plant
    /// corrupted content.
    pub fn insert_raw(&self, key: &DraftKey, value: impl Into<String>) {
        self.data.insert(Self::render_key(key), value.into());
    }

    /// Render a [`DraftKey`] into the string used as the map key.
    fn render_key(key: &DraftKey) -> String {
        key.canonical()
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn get(&self, key: &DraftKey) -> Result<Option<String>, StateError> {
        let rendered = Self::render_key(key);
        Ok(self.data.get(&rendered).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &DraftKey, value: &str) -> Result<(), StateError> {
        if let Some(limit) = self.quota {
            if value.len() > limit {
                return Err(StateError::QuotaExceeded {
                    size: value.len(),
                    limit,
                });
            }
        }
        self.data.insert(Self::render_key(key), value.to_owned());
        Ok(())
    }

    async fn delete(&self, key: &DraftKey) -> Result<bool, StateError> {
        let rendered = Self::render_key(key);
        Ok(self.data.remove(&rendered).is_some())
    }
}
