use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::field::{FieldValue, Fields};
use crate::types::{RecordKey, RemoteId};

/// One independently synced sub-record of a section: a specific address,
/// education level, experience entry or identity document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub key: RecordKey,
    /// Absent until the first successful create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub attachments: BTreeMap<String, Attachment>,
    /// When set, this record copies another record of the same section
    /// and is never sent to the backend on its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_of: Option<RecordKey>,
}

impl SectionRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new(key: impl Into<RecordKey>) -> Self {
        Self {
            key: key.into(),
            remote_id: None,
            fields: Fields::new(),
            attachments: BTreeMap::new(),
            mirror_of: None,
        }
    }

    /// Set the remote identifier.
    #[must_use]
    pub fn with_remote_id(mut self, id: impl Into<RemoteId>) -> Self {
        self.remote_id = Some(id.into());
        self
    }

    /// Set a field value.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Add or replace an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.insert(attachment.slot.clone(), attachment);
        self
    }

    /// Field value, or `Unset` when the field was never touched.
    #[must_use]
    pub fn field(&self, name: &str) -> &FieldValue {
        static UNSET: FieldValue = FieldValue::Unset;
        self.fields.get(name).unwrap_or(&UNSET)
    }

    /// Returns `true` if any attachment carries a file awaiting upload.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.attachments.values().any(Attachment::is_pending)
    }

    /// Returns `true` if the slot holds a pending or stored file.
    #[must_use]
    pub fn has_file(&self, slot: &str) -> bool {
        self.attachments.get(slot).is_some_and(Attachment::is_present)
    }

    /// Copy of this record with every in-memory file removed.
    #[must_use]
    pub fn without_pending(&self) -> Self {
        Self {
            attachments: self
                .attachments
                .iter()
                .map(|(slot, a)| (slot.clone(), a.without_pending()))
                .collect(),
            ..self.clone()
        }
    }

    /// Compare the comparable content of two records.
    ///
    /// Ignores the remote identifier, the mirror link and the named derived
    /// fields. Field values compare by canonical form; attachments compare
    /// by slot and file name or server path.
    #[must_use]
    pub fn same_content(&self, other: &Self, derived: &BTreeSet<String>) -> bool {
        let names: BTreeSet<&String> = self
            .fields
            .keys()
            .chain(other.fields.keys())
            .filter(|name| !derived.contains(*name))
            .collect();
        let fields_equal = names
            .into_iter()
            .all(|name| self.field(name).same_as(other.field(name)));

        let ours: Vec<_> = self
            .attachments
            .values()
            .filter(|a| a.is_present() || a.file_name.is_some())
            .map(Attachment::comparison_key)
            .collect();
        let theirs: Vec<_> = other
            .attachments
            .values()
            .filter(|a| a.is_present() || a.file_name.is_some())
            .map(Attachment::comparison_key)
            .collect();

        fields_equal && ours == theirs
    }

    /// Overwrite this record's content with `source`, keeping its own key.
    pub fn mirror_from(&mut self, source: &SectionRecord) {
        self.remote_id.clone_from(&source.remote_id);
        self.fields.clone_from(&source.fields);
        self.attachments = source
            .attachments
            .iter()
            .map(|(slot, a)| (slot.clone(), a.without_pending()))
            .collect();
        self.mirror_of = Some(source.key.clone());
    }

    /// Stop mirroring. The copied field values stay for editing, but the
    /// source's identifier and stored files are dropped so the record is
    /// created on its own next time. No-op for a record that is not a copy.
    pub fn detach_mirror(&mut self) {
        if self.mirror_of.take().is_some() {
            self.remote_id = None;
            self.attachments.clear();
        }
    }
}
