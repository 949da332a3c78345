use serde::{Deserialize, Serialize};

use crate::types::{RecordKey, Section};

/// How a record compares against the last synced snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Never synced: absent from the snapshot or without a remote identifier.
    New,
    /// Synced and untouched since.
    Unchanged,
    /// Synced and edited since.
    Changed,
    /// Copies another record; synced through its source.
    Mirror,
    /// Present in the snapshot only. There is no remote delete, so the
    /// record stays on the server.
    Removed,
}

impl Classification {
    /// Returns `true` if the record needs a network call.
    #[must_use]
    pub fn needs_call(self) -> bool {
        matches!(self, Self::New | Self::Changed)
    }
}

/// Result of a completed section sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Every record matched the snapshot; no call was made.
    NothingToDo { section: Section },
    /// At least one create or update succeeded.
    Synced(SyncReport),
}

impl SyncOutcome {
    #[must_use]
    pub fn is_nothing_to_do(&self) -> bool {
        matches!(self, Self::NothingToDo { .. })
    }

    /// Human-readable status line.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::NothingToDo { .. } => "No changes to save".to_owned(),
            Self::Synced(report) => format!(
                "Saved {} ({} created, {} updated)",
                report.section,
                report.created.len(),
                report.updated.len()
            ),
        }
    }
}

/// What a successful sync did to each record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub section: Section,
    #[serde(default)]
    pub created: Vec<RecordKey>,
    #[serde(default)]
    pub updated: Vec<RecordKey>,
    #[serde(default)]
    pub mirrored: Vec<RecordKey>,
    #[serde(default)]
    pub unchanged: Vec<RecordKey>,
}

impl SyncReport {
    #[must_use]
    pub fn new(section: Section) -> Self {
        Self {
            section,
            created: Vec::new(),
            updated: Vec::new(),
            mirrored: Vec::new(),
            unchanged: Vec::new(),
        }
    }

    /// Number of network calls the sync issued.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}
