//! Reconciling a local draft with the records fetched from the server.

use onboard_core::{Attachment, Draft, SectionRecord};

/// Merge fetched records into a non-empty local draft.
///
/// Local field values win. The server fills in what the draft is missing:
/// the remote identifier, fields the user never touched, stored files for
/// empty slots and whole records the draft does not know. Local-only
/// records stay as they are.
pub fn merge_remote(local: &Draft, remote: &[SectionRecord]) -> Draft {
    let mut merged = local.clone();
    for theirs in remote {
        match merged.records.get_mut(&theirs.key) {
            Some(ours) => merge_record(ours, theirs),
            None => {
                merged.upsert(theirs.without_pending());
            }
        }
    }
    merged
}

fn merge_record(ours: &mut SectionRecord, theirs: &SectionRecord) {
    if ours.remote_id.is_none() {
        ours.remote_id.clone_from(&theirs.remote_id);
    }

    for (name, value) in &theirs.fields {
        ours.fields
            .entry(name.clone())
            .or_insert_with(|| value.clone());
    }

    for (slot, stored) in &theirs.attachments {
        let Some(path) = &stored.server_path else {
            continue;
        };
        match ours.attachments.get_mut(slot) {
            Some(a) if a.is_present() => {}
            Some(a) => a.server_path = Some(path.clone()),
            None => {
                ours.attachments
                    .insert(slot.clone(), Attachment::stored(slot, path));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use onboard_core::{FieldValue, PendingFile, Section};

    use super::*;

    fn remote_permanent() -> SectionRecord {
        SectionRecord::new("permanent")
            .with_remote_id("addr-1")
            .with_field("city", "Pune")
            .with_field("state", "Maharashtra")
            .with_attachment(Attachment::stored("proof", "/s/proof.pdf"))
    }

    #[test]
    fn local_fields_win() {
        let mut local = Draft::new(Section::Address);
        local.set_field("permanent", "city", "Mumbai");

        let merged = merge_remote(&local, &[remote_permanent()]);
        let record = merged.record("permanent").unwrap();
        assert_eq!(record.field("city"), &FieldValue::text("Mumbai"));
        assert_eq!(record.field("state"), &FieldValue::text("Maharashtra"));
        assert_eq!(record.remote_id.as_deref(), Some("addr-1"));
        assert_eq!(
            record.attachments["proof"].server_path.as_deref(),
            Some("/s/proof.pdf")
        );
    }

    #[test]
    fn pending_files_are_not_replaced() {
        let mut local = Draft::new(Section::Address);
        local.attach(
            "permanent",
            "proof",
            PendingFile::new("new.pdf", "application/pdf", vec![1u8]),
        );

        let merged = merge_remote(&local, &[remote_permanent()]);
        let proof = &merged.record("permanent").unwrap().attachments["proof"];
        assert!(proof.is_pending());
        assert!(proof.server_path.is_none());
        assert_eq!(proof.file_name.as_deref(), Some("new.pdf"));
    }

    #[test]
    fn remote_only_records_are_added_and_local_only_kept() {
        let mut local = Draft::new(Section::Address);
        local.set_field("temporary", "city", "Goa");

        let merged = merge_remote(&local, &[remote_permanent()]);
        assert_eq!(merged.records.len(), 2);
        assert!(merged.record("temporary").unwrap().remote_id.is_none());
        assert_eq!(
            merged.record("permanent").unwrap().remote_id.as_deref(),
            Some("addr-1")
        );
    }

    #[test]
    fn local_remote_id_is_kept() {
        let local = Draft::from_records(
            Section::Address,
            [SectionRecord::new("permanent").with_remote_id("addr-local")],
        );
        let merged = merge_remote(&local, &[remote_permanent()]);
        assert_eq!(
            merged.record("permanent").unwrap().remote_id.as_deref(),
            Some("addr-local")
        );
    }
}
