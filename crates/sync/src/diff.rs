//! Classifying draft records against the last synced snapshot.

use std::collections::BTreeMap;

use serde::Serialize;

use onboard_core::{
    Classification, Draft, RecordKey, RemoteId, SectionSchema, Snapshot, ValidationError,
};

/// Classification of every record of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionDiff {
    pub entries: BTreeMap<RecordKey, Classification>,
}

impl SectionDiff {
    pub fn classification(&self, key: &str) -> Option<Classification> {
        self.entries.get(key).copied()
    }

    /// Keys of the records that need a create or update.
    pub fn needing_calls(&self) -> impl Iterator<Item = &RecordKey> {
        self.entries
            .iter()
            .filter(|(_, c)| c.needs_call())
            .map(|(k, _)| k)
    }

    pub fn keys_with(&self, class: Classification) -> Vec<RecordKey> {
        self.entries
            .iter()
            .filter(|(_, c)| **c == class)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Returns `true` if no record needs a network call.
    pub fn is_nothing_to_do(&self) -> bool {
        self.needing_calls().next().is_none()
    }
}

/// Classification plus the first completeness problem, if any. Produced
/// without touching the network.
#[derive(Debug, Clone, Serialize)]
pub struct SectionStatus {
    pub diff: SectionDiff,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
}

/// Remote identifier to address a record with: the draft's own, falling
/// back to the one the snapshot knows.
pub fn effective_remote_id<'a>(
    draft: &'a Draft,
    snapshot: &'a Snapshot,
    key: &str,
) -> Option<&'a RemoteId> {
    draft
        .record(key)
        .and_then(|r| r.remote_id.as_ref())
        .or_else(|| snapshot_remote_id(snapshot, key))
}

/// Identifier the snapshot holds for `key` as a record of its own. A
/// snapshot entry that was a copy carries its source's identifier, which
/// never belongs to the record once it is detached.
pub(crate) fn snapshot_remote_id<'a>(
    snapshot: &'a Snapshot,
    key: &str,
) -> Option<&'a RemoteId> {
    snapshot
        .record(key)
        .filter(|r| r.mirror_of.is_none())
        .and_then(|r| r.remote_id.as_ref())
}

/// Classify every record without validating.
pub fn classify(draft: &Draft, snapshot: &Snapshot, schema: &SectionSchema) -> SectionDiff {
    let mut entries = BTreeMap::new();

    for (key, record) in &draft.records {
        let class = if record.mirror_of.is_some() {
            Classification::Mirror
        } else {
            match snapshot.record(key) {
                None => Classification::New,
                Some(_) if effective_remote_id(draft, snapshot, key).is_none() => {
                    Classification::New
                }
                Some(_) if record.has_pending() => Classification::Changed,
                Some(synced) if record.same_content(synced, &schema.derived_fields) => {
                    Classification::Unchanged
                }
                Some(_) => Classification::Changed,
            }
        };
        entries.insert(key.clone(), class);
    }

    for key in snapshot.records.keys() {
        entries
            .entry(key.clone())
            .or_insert(Classification::Removed);
    }

    SectionDiff { entries }
}

/// Validate the draft, then classify it.
///
/// Any missing mandatory field or document aborts the whole section.
pub fn diff(
    draft: &Draft,
    snapshot: &Snapshot,
    schema: &SectionSchema,
) -> Result<SectionDiff, ValidationError> {
    schema.validate(draft)?;
    Ok(classify(draft, snapshot, schema))
}

/// Classification and validation result for display.
pub fn status(draft: &Draft, snapshot: &Snapshot, schema: &SectionSchema) -> SectionStatus {
    SectionStatus {
        diff: classify(draft, snapshot, schema),
        problem: schema.validate(draft).err().map(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use onboard_core::{Attachment, PendingFile, Section, SectionRecord};

    use super::*;

    fn synced(key: &str, city: &str) -> SectionRecord {
        SectionRecord::new(key)
            .with_remote_id(format!("id-{key}"))
            .with_field("city", city)
    }

    fn schema() -> SectionSchema {
        SectionSchema::new(Section::Address).derived(["age"])
    }

    #[test]
    fn classification_rules() {
        let snapshot = Snapshot::from_records(
            Section::Address,
            [synced("same", "Pune"), synced("edited", "Pune"), synced("gone", "Goa")],
        );
        let mut draft = Draft::from_records(
            Section::Address,
            [
                synced("same", "Pune"),
                synced("edited", "Mumbai"),
                SectionRecord::new("fresh").with_field("city", "Delhi"),
            ],
        );
        draft.set_mirror("copy", Some("same".into()));

        let diff = classify(&draft, &snapshot, &schema());
        assert_eq!(diff.classification("same"), Some(Classification::Unchanged));
        assert_eq!(diff.classification("edited"), Some(Classification::Changed));
        assert_eq!(diff.classification("fresh"), Some(Classification::New));
        assert_eq!(diff.classification("copy"), Some(Classification::Mirror));
        assert_eq!(diff.classification("gone"), Some(Classification::Removed));
        let needing: Vec<_> = diff.needing_calls().map(RecordKey::as_str).collect();
        assert_eq!(needing, vec!["edited", "fresh"]);
    }

    #[test]
    fn derived_fields_and_remote_id_are_ignored() {
        let snapshot = Snapshot::from_records(
            Section::Address,
            [synced("permanent", "Pune").with_field("age", 30)],
        );
        let draft = Draft::from_records(
            Section::Address,
            [SectionRecord::new("permanent")
                .with_field("city", "Pune")
                .with_field("age", 31)],
        );
        let diff = classify(&draft, &snapshot, &schema());
        assert_eq!(diff.classification("permanent"), Some(Classification::Unchanged));
        assert!(diff.is_nothing_to_do());
    }

    #[test]
    fn snapshot_entry_without_remote_id_is_new() {
        let snapshot = Snapshot::from_records(
            Section::Address,
            [SectionRecord::new("permanent").with_field("city", "Pune")],
        );
        let draft = Draft::from_records(
            Section::Address,
            [SectionRecord::new("permanent").with_field("city", "Mumbai")],
        );
        let diff = classify(&draft, &snapshot, &schema());
        assert_eq!(diff.classification("permanent"), Some(Classification::New));
    }

    #[test]
    fn detached_copy_does_not_borrow_the_source_id() {
        let mut synced_copy = synced("permanent", "Pune");
        synced_copy.key = RecordKey::new("temporary");
        synced_copy.mirror_of = Some(RecordKey::new("permanent"));
        let snapshot =
            Snapshot::from_records(Section::Address, [synced("permanent", "Pune"), synced_copy]);

        let draft = Draft::from_records(
            Section::Address,
            [
                synced("permanent", "Pune"),
                SectionRecord::new("temporary").with_field("city", "Goa"),
            ],
        );
        assert!(effective_remote_id(&draft, &snapshot, "temporary").is_none());
        let diff = classify(&draft, &snapshot, &schema());
        assert_eq!(diff.classification("temporary"), Some(Classification::New));
        assert_eq!(diff.classification("permanent"), Some(Classification::Unchanged));
    }

    #[test]
    fn pending_file_forces_changed() {
        let snapshot = Snapshot::from_records(
            Section::Address,
            [synced("permanent", "Pune")
                .with_attachment(Attachment::stored("proof", "/s/a.pdf"))],
        );
        let mut draft = Draft::from_records(
            Section::Address,
            [synced("permanent", "Pune")
                .with_attachment(Attachment::stored("proof", "/s/a.pdf"))],
        );
        assert!(classify(&draft, &snapshot, &schema()).is_nothing_to_do());

        draft.attach(
            "permanent",
            "proof",
            PendingFile::new("b.pdf", "application/pdf", vec![0u8]),
        );
        assert_eq!(
            classify(&draft, &snapshot, &schema()).classification("permanent"),
            Some(Classification::Changed)
        );
    }

    #[test]
    fn equal_values_of_different_types_are_unchanged() {
        let snapshot = Snapshot::from_records(
            Section::Education,
            [SectionRecord::new("10th")
                .with_remote_id("e1")
                .with_field("year_of_passing", 2010)],
        );
        let draft = Draft::from_records(
            Section::Education,
            [SectionRecord::new("10th")
                .with_remote_id("e1")
                .with_field("year_of_passing", "2010")],
        );
        let schema = SectionSchema::new(Section::Education);
        assert!(classify(&draft, &snapshot, &schema).is_nothing_to_do());
    }

    #[test]
    fn incomplete_record_fails_validation() {
        let schema = SectionSchema::new(Section::Identity)
            .require_slots(["passport_scan"])
            .require_record("passport");
        let draft = Draft::from_records(
            Section::Identity,
            [SectionRecord::new("passport").with_field("identity_file_number", "Z123")],
        );
        let err = diff(&draft, &Snapshot::empty(Section::Identity), &schema).unwrap_err();
        assert_eq!(err.missing_name(), "passport_scan");

        let report = status(&draft, &Snapshot::empty(Section::Identity), &schema);
        assert!(report.problem.unwrap().contains("passport_scan"));
        assert_eq!(report.diff.classification("passport"), Some(Classification::New));
    }
}
