use onboard_core::Section;

use crate::error::StateError;
use crate::key::{DraftKey, EntryKind};
use crate::store::DraftStore;

fn test_key(kind: EntryKind, section: Section) -> DraftKey {
    DraftKey::new("test-token", section, kind)
}

/// Run the full draft store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_store_conformance_tests(store: &dyn DraftStore) -> Result<(), StateError> {
    test_get_missing(store).await?;
    test_set_and_get(store).await?;
    test_overwrite(store).await?;
    test_delete(store).await?;
    test_token_isolation(store).await?;
    test_kind_isolation(store).await?;
    test_unicode_round_trip(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn DraftStore) -> Result<(), StateError> {
    let key = test_key(EntryKind::Draft, Section::Personal);
    let val = store.get(&key).await?;
    assert!(val.is_none(), "get on missing key should return None");
    Ok(())
}

async fn test_set_and_get(store: &dyn DraftStore) -> Result<(), StateError> {
    let key = test_key(EntryKind::Draft, Section::Address);
    store.set(&key, r#"{"city":"Pune"}"#).await?;
    let val = store.get(&key).await?;
    assert_eq!(val.as_deref(), Some(r#"{"city":"Pune"}"#));
    Ok(())
}

async fn test_overwrite(store: &dyn DraftStore) -> Result<(), StateError> {
    let key = test_key(EntryKind::Draft, Section::Experience);
    store.set(&key, "v1").await?;
    store.set(&key, "v2").await?;
    let val = store.get(&key).await?;
    assert_eq!(val.as_deref(), Some("v2"), "set should overwrite");
    Ok(())
}

async fn test_delete(store: &dyn DraftStore) -> Result<(), StateError> {
    let key = test_key(EntryKind::Snapshot, Section::Address);
    store.set(&key, "bye").await?;
    let existed = store.delete(&key).await?;
    assert!(existed, "delete should return true for existing key");
    let val = store.get(&key).await?;
    assert!(val.is_none(), "get after delete should return None");

    let existed = store.delete(&key).await?;
    assert!(!existed, "delete on missing key should return false");
    Ok(())
}

async fn test_token_isolation(store: &dyn DraftStore) -> Result<(), StateError> {
    let ours = DraftKey::draft("token-a", Section::Identity);
    let theirs = DraftKey::draft("token-b", Section::Identity);
    store.set(&ours, "mine").await?;
    let val = store.get(&theirs).await?;
    assert!(val.is_none(), "another token must not see the draft");
    Ok(())
}

async fn test_kind_isolation(store: &dyn DraftStore) -> Result<(), StateError> {
    let draft = test_key(EntryKind::Draft, Section::Education);
    let snapshot = test_key(EntryKind::Snapshot, Section::Education);
    store.set(&draft, "draft").await?;
    store.set(&snapshot, "snapshot").await?;
    assert_eq!(store.get(&draft).await?.as_deref(), Some("draft"));
    assert_eq!(store.get(&snapshot).await?.as_deref(), Some("snapshot"));
    Ok(())
}

async fn test_unicode_round_trip(store: &dyn DraftStore) -> Result<(), StateError> {
    let key = DraftKey::draft("tök/en:ü", Section::Personal);
    store.set(&key, "नाम").await?;
    assert_eq!(store.get(&key).await?.as_deref(), Some("नाम"));
    Ok(())
}
