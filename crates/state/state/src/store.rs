use async_trait::async_trait;

use crate::error::StateError;
use crate::key::DraftKey;

/// Trait for persisting serialized drafts and snapshots.
///
/// Values are opaque strings; typing, file stripping and fallback handling
/// live one layer up. Implementations must be `Send + Sync`.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Get the value for a key. Returns `None` if not found.
    async fn get(&self, key: &DraftKey) -> Result<Option<String>, StateError>;

    /// Set a value, overwriting any previous value.
    async fn set(&self, key: &DraftKey, value: &str) -> Result<(), StateError>;

    /// Delete a key. Returns `true` if the key existed.
    async fn delete(&self, key: &DraftKey) -> Result<bool, StateError>;
}
