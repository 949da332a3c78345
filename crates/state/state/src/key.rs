use serde::{Deserialize, Serialize};

use onboard_core::{Section, SessionToken};

/// The kind of entry being stored for a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// The locally edited draft.
    Draft,
    /// The last synced snapshot.
    Snapshot,
}

impl EntryKind {
    /// Return a string representation of the entry kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Snapshot => "snapshot",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key used to address entries in a draft store.
///
/// Every key carries the session token, so entries of different onboarding
/// links can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftKey {
    pub token: SessionToken,
    pub section: Section,
    pub kind: EntryKind,
}

impl DraftKey {
    /// Create a new draft key.
    #[must_use]
    pub fn new(token: impl Into<SessionToken>, section: Section, kind: EntryKind) -> Self {
        Self {
            token: token.into(),
            section,
            kind,
        }
    }

    /// Key of the draft entry of a section.
    #[must_use]
    pub fn draft(token: impl Into<SessionToken>, section: Section) -> Self {
        Self::new(token, section, EntryKind::Draft)
    }

    /// Key of the snapshot entry of a section.
    #[must_use]
    pub fn snapshot(token: impl Into<SessionToken>, section: Section) -> Self {
        Self::new(token, section, EntryKind::Snapshot)
    }

    /// Return a canonical string representation: `token:section:kind`
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}:{}:{}", self.token, self.section, self.kind)
    }
}

impl std::fmt::Display for DraftKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_kind_as_str() {
        assert_eq!(EntryKind::Draft.as_str(), "draft");
        assert_eq!(EntryKind::Snapshot.as_str(), "snapshot");
    }

    #[test]
    fn entry_kind_serializes_as_its_name() {
        assert_eq!(serde_json::to_string(&EntryKind::Snapshot).unwrap(), "\"snapshot\"");
        let kind: EntryKind = serde_json::from_str("\"draft\"").unwrap();
        assert_eq!(kind, EntryKind::Draft);
        assert!(serde_json::from_str::<EntryKind>("\"meta\"").is_err());
    }

    #[test]
    fn draft_key_canonical() {
        let key = DraftKey::draft("tok-1", Section::Address);
        assert_eq!(key.canonical(), "tok-1:address:draft");
        let key = DraftKey::snapshot("tok-1", Section::Education);
        assert_eq!(key.to_string(), "tok-1:education:snapshot");
    }

    #[test]
    fn tokens_scope_keys() {
        let a = DraftKey::draft("tok-a", Section::Personal);
        let b = DraftKey::draft("tok-b", Section::Personal);
        assert_ne!(a, b);
        assert_ne!(a.canonical(), b.canonical());
    }
}
