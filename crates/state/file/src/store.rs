use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;

use onboard_state::error::StateError;
use onboard_state::key::DraftKey;
use onboard_state::store::DraftStore;

/// Characters escaped in file names. Everything but `[A-Za-z0-9._-]`.
const FILE_NAME: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'_').remove(b'-');

/// Draft store that keeps one JSON file per key under a root directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write never leaves a truncated entry behind.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    root: PathBuf,
}

impl FileDraftStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &DraftKey) -> PathBuf {
        let name = utf8_percent_encode(&key.canonical(), FILE_NAME).to_string();
        self.root.join(format!("{name}.json"))
    }
}

#[async_trait]
impl DraftStore for FileDraftStore {
    async fn get(&self, key: &DraftKey) -> Result<Option<String>, StateError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &DraftKey, value: &str) -> Result<(), StateError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(key);
        let tmp = self.root.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(key = %key, path = %path.display(), "draft entry written");
        Ok(())
    }

    async fn delete(&self, key: &DraftKey) -> Result<bool, StateError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use onboard_core::Section;
    use onboard_state::testing::run_store_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(tmp.path());
        run_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn file_names_are_escaped() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(tmp.path());
        let key = DraftKey::draft("a/b:c", Section::Personal);

        let path = store.path_for(&key);
        assert_eq!(path.parent(), Some(tmp.path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, "a%2Fb%3Ac%3Apersonal%3Adraft.json");

        store.set(&key, "{}").await.unwrap();
        assert!(tokio::fs::try_exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn get_before_any_write_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(tmp.path().join("not-created-yet"));
        let key = DraftKey::snapshot("tok", Section::Address);
        assert!(store.get(&key).await.unwrap().is_none());
        assert!(!store.delete(&key).await.unwrap());
    }

    #[tokio::test]
    async fn first_write_creates_the_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("drafts");
        let store = FileDraftStore::new(&dir);
        let key = DraftKey::draft("tok", Section::Address);

        store.set(&key, "{\"records\":{}}").await.unwrap();
        assert!(dir.is_dir());
        assert_eq!(
            store.get(&key).await.unwrap().as_deref(),
            Some("{\"records\":{}}")
        );
    }

    #[tokio::test]
    async fn no_temporary_files_left_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(tmp.path());
        for section in Section::ALL {
            store
                .set(&DraftKey::draft("tok", section), "{}")
                .await
                .unwrap();
        }

        let mut entries = tokio::fs::read_dir(tmp.path()).await.unwrap();
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name().to_string_lossy().into_owned();
            assert!(!name.ends_with(".tmp"), "leftover temp file {name}");
            count += 1;
        }
        assert_eq!(count, Section::ALL.len());
    }
}
