use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::{Attachment, PendingFile};
use crate::field::FieldValue;
use crate::record::SectionRecord;
use crate::types::{RecordKey, Section};

/// The locally edited state of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub section: Section,
    #[serde(default)]
    pub records: BTreeMap<RecordKey, SectionRecord>,
    pub updated_at: DateTime<Utc>,
}

impl Draft {
    /// Create an empty draft for a section.
    #[must_use]
    pub fn new(section: Section) -> Self {
        Self {
            section,
            records: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Build a draft from a list of records.
    #[must_use]
    pub fn from_records(
        section: Section,
        records: impl IntoIterator<Item = SectionRecord>,
    ) -> Self {
        Self {
            section,
            records: records.into_iter().map(|r| (r.key.clone(), r)).collect(),
            updated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn record(&self, key: &str) -> Option<&SectionRecord> {
        self.records.get(key)
    }

    /// Mutable access to a record, creating it when missing.
    pub fn record_mut(&mut self, key: impl Into<RecordKey>) -> &mut SectionRecord {
        let key = key.into();
        self.updated_at = Utc::now();
        self.records
            .entry(key.clone())
            .or_insert_with(|| SectionRecord::new(key))
    }

    /// Insert or replace a whole record.
    pub fn upsert(&mut self, record: SectionRecord) {
        self.updated_at = Utc::now();
        self.records.insert(record.key.clone(), record);
    }

    /// Set one field of one record.
    pub fn set_field(
        &mut self,
        key: impl Into<RecordKey>,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) {
        self.record_mut(key).fields.insert(name.into(), value.into());
    }

    /// Attach a newly chosen file to a record slot.
    pub fn attach(
        &mut self,
        key: impl Into<RecordKey>,
        slot: impl Into<String>,
        file: PendingFile,
    ) {
        let slot = slot.into();
        self.record_mut(key)
            .attachments
            .insert(slot.clone(), Attachment::pending(slot, file));
    }

    /// Mark `key` as a copy of `source`, or detach it with `None`.
    ///
    /// Linking copies the source content immediately so the draft shows the
    /// mirrored values before any sync.
    pub fn set_mirror(&mut self, key: impl Into<RecordKey>, source: Option<RecordKey>) {
        let key = key.into();
        match source.and_then(|s| self.records.get(&s).cloned()) {
            Some(source) => {
                self.record_mut(key).mirror_from(&source);
            }
            None => {
                self.record_mut(key).detach_mirror();
            }
        }
    }

    /// Remove a record. Returns the removed record.
    pub fn remove_record(&mut self, key: &str) -> Option<SectionRecord> {
        self.updated_at = Utc::now();
        self.records.remove(key)
    }

    /// Returns `true` if any record holds a file awaiting upload.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.records.values().any(SectionRecord::has_pending)
    }

    /// Copy of this draft safe to persist: no in-memory files.
    #[must_use]
    pub fn without_pending(&self) -> Self {
        Self {
            section: self.section,
            records: self
                .records
                .iter()
                .map(|(k, r)| (k.clone(), r.without_pending()))
                .collect(),
            updated_at: self.updated_at,
        }
    }
}

/// Last known-synced state of a section, used only for diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub section: Section,
    #[serde(default)]
    pub records: BTreeMap<RecordKey, SectionRecord>,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// An empty snapshot: nothing has ever been synced.
    #[must_use]
    pub fn empty(section: Section) -> Self {
        Self {
            section,
            records: BTreeMap::new(),
            captured_at: Utc::now(),
        }
    }

    /// Capture records fetched from the backend.
    #[must_use]
    pub fn from_records(
        section: Section,
        records: impl IntoIterator<Item = SectionRecord>,
    ) -> Self {
        Self {
            section,
            records: records
                .into_iter()
                .map(|r| (r.key.clone(), r.without_pending()))
                .collect(),
            captured_at: Utc::now(),
        }
    }

    /// Capture the current state of a draft after a successful sync.
    #[must_use]
    pub fn of_draft(draft: &Draft) -> Self {
        Self {
            section: draft.section,
            records: draft.without_pending().records,
            captured_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn record(&self, key: &str) -> Option<&SectionRecord> {
        self.records.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
