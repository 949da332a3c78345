//! Per-section completeness rules.
//!
//! A [`SectionSchema`] says which fields and attachment slots a record must
//! carry before the section may be synced, which fields are derived (and so
//! excluded from diffing), and which records must exist at all.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::draft::Draft;
use crate::error::{Missing, ValidationError};
use crate::lookup::{self, EducationMapping, IdentityType};
use crate::record::SectionRecord;
use crate::types::{RecordKey, Section};

/// Key of the single record of the personal section.
pub const PERSONAL_RECORD: &str = "personal";
/// Keys of the two address records.
pub const PERMANENT_ADDRESS: &str = "permanent";
pub const TEMPORARY_ADDRESS: &str = "temporary";
/// Slot holding the scan of an identity document.
pub const IDENTITY_DOCUMENT_SLOT: &str = "document";

/// Documents expected for each employment type.
pub const EMPLOYMENT_DOCUMENT_RULES: [(&str, &[&str]); 5] = [
    ("Full-Time", &["exp_certificate_path", "payslip_path"]),
    ("Part-Time", &["exp_certificate_path"]),
    ("Intern", &["internship_certificate_path"]),
    ("Contract", &["contract_aggrement_path"]),
    ("Freelance", &["exp_certificate_path"]),
];

/// Fields and slots one record must fill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRequirements {
    #[serde(default)]
    pub mandatory_fields: Vec<String>,
    #[serde(default)]
    pub mandatory_slots: Vec<String>,
}

impl RecordRequirements {
    #[must_use]
    pub fn new<F, S>(fields: F, slots: S) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            mandatory_fields: fields.into_iter().map(Into::into).collect(),
            mandatory_slots: slots.into_iter().map(Into::into).collect(),
        }
    }
}

/// Derives mandatory slots from the value of a field, e.g. the documents
/// required for an employment type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRule {
    pub field: String,
    pub slots_by_value: BTreeMap<String, Vec<String>>,
}

/// Completeness rules for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSchema {
    pub section: Section,
    /// Requirements for records without a specific entry in `records`.
    #[serde(default)]
    pub defaults: RecordRequirements,
    #[serde(default)]
    pub records: BTreeMap<RecordKey, RecordRequirements>,
    /// Records that must exist in the draft.
    #[serde(default)]
    pub required_records: Vec<RecordKey>,
    /// Computed fields excluded from diffing.
    #[serde(default)]
    pub derived_fields: BTreeSet<String>,
    #[serde(default)]
    pub slot_rule: Option<SlotRule>,
    /// `(field, flag)`: the field is mandatory unless the flag field is set.
    #[serde(default)]
    pub required_unless: Vec<(String, String)>,
    /// Records that must exist before the keyed record may sync.
    #[serde(default)]
    pub prerequisites: BTreeMap<RecordKey, Vec<RecordKey>>,
}

impl SectionSchema {
    /// A schema with no requirements.
    #[must_use]
    pub fn new(section: Section) -> Self {
        Self {
            section,
            defaults: RecordRequirements::default(),
            records: BTreeMap::new(),
            required_records: Vec::new(),
            derived_fields: BTreeSet::new(),
            slot_rule: None,
            required_unless: Vec::new(),
            prerequisites: BTreeMap::new(),
        }
    }

    /// Add mandatory fields for every record.
    #[must_use]
    pub fn require_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.defaults
            .mandatory_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Add mandatory attachment slots for every record.
    #[must_use]
    pub fn require_slots<I>(mut self, slots: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.defaults
            .mandatory_slots
            .extend(slots.into_iter().map(Into::into));
        self
    }

    /// Override the requirements of one record.
    #[must_use]
    pub fn for_record(
        mut self,
        key: impl Into<RecordKey>,
        requirements: RecordRequirements,
    ) -> Self {
        self.records.insert(key.into(), requirements);
        self
    }

    /// Mark fields as derived.
    #[must_use]
    pub fn derived<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.derived_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Require a record to exist.
    #[must_use]
    pub fn require_record(mut self, key: impl Into<RecordKey>) -> Self {
        self.required_records.push(key.into());
        self
    }

    /// Requirements that apply to a record key.
    #[must_use]
    pub fn requirements(&self, key: &str) -> &RecordRequirements {
        self.records.get(key).unwrap_or(&self.defaults)
    }

    /// Slots a record must fill, including those derived from its fields.
    #[must_use]
    pub fn mandatory_slots(&self, record: &SectionRecord) -> Vec<String> {
        let mut slots = self.requirements(&record.key).mandatory_slots.clone();
        if let Some(rule) = &self.slot_rule {
            if let Some(value) = record.field(&rule.field).canonical() {
                if let Some(extra) = rule.slots_by_value.get(&value) {
                    for slot in extra {
                        if !slots.contains(slot) {
                            slots.push(slot.clone());
                        }
                    }
                }
            }
        }
        slots
    }

    /// Check one record; reports the first missing field, then slot.
    pub fn validate_record(&self, record: &SectionRecord) -> Result<(), ValidationError> {
        let requirements = self.requirements(&record.key);
        for name in &requirements.mandatory_fields {
            if record.field(name).is_empty() {
                return Err(ValidationError::field(record.key.clone(), name.clone()));
            }
        }
        for (name, flag) in &self.required_unless {
            if !record.field(flag).as_flag() && record.field(name).is_empty() {
                return Err(ValidationError::field(record.key.clone(), name.clone()));
            }
        }
        for slot in self.mandatory_slots(record) {
            if !record.has_file(&slot) {
                return Err(ValidationError::slot(record.key.clone(), slot));
            }
        }
        Ok(())
    }

    /// Check a whole draft. Mirror records are skipped: they inherit the
    /// completeness of their source.
    pub fn validate(&self, draft: &Draft) -> Result<(), ValidationError> {
        for key in &self.required_records {
            if !draft.records.contains_key(key) {
                self.validate_record(&SectionRecord::new(key.clone()))?;
            }
        }
        for record in draft.records.values() {
            if record.mirror_of.is_some() {
                continue;
            }
            self.validate_record(record)?;
            if let Some(required) = self.prerequisites.get(&record.key) {
                if let Some(missing) = required.iter().find(|k| !draft.records.contains_key(*k)) {
                    return Err(ValidationError {
                        record: record.key.clone(),
                        missing: Missing::Prerequisite(missing.to_string()),
                    });
                }
            }
        }
        Ok(())
    }

    /// Personal details: a single record.
    #[must_use]
    pub fn personal() -> Self {
        Self::new(Section::Personal)
            .require_fields([
                "date_of_birth",
                "gender",
                "marital_status",
                "blood_group",
                "nationality_country_uuid",
                "residence_country_uuid",
                "emergency_contact",
            ])
            .require_record(PERSONAL_RECORD)
    }

    /// Permanent and temporary address.
    #[must_use]
    pub fn address() -> Self {
        Self::new(Section::Address)
            .require_fields([
                "address_line1",
                "city",
                "district_or_ward",
                "state_or_region",
                "postal_code",
                "country_uuid",
            ])
            .require_record(PERMANENT_ADDRESS)
    }

    /// Work experience entries; documents depend on the employment type.
    #[must_use]
    pub fn experience() -> Self {
        let mut schema = Self::new(Section::Experience).require_fields([
            "company_name",
            "role_title",
            "start_date",
            "employment_type",
            "remarks",
        ]);
        schema.slot_rule = Some(SlotRule {
            field: "employment_type".to_owned(),
            slots_by_value: EMPLOYMENT_DOCUMENT_RULES
                .iter()
                .map(|(kind, slots)| {
                    (
                        (*kind).to_owned(),
                        slots.iter().map(|s| (*s).to_owned()).collect(),
                    )
                })
                .collect(),
        });
        schema
            .required_unless
            .push(("end_date".to_owned(), "is_current".to_owned()));
        schema
    }

    /// Identity documents for a country: one record per identity type,
    /// keyed by the type's identifier.
    ///
    /// Every entered document needs its number and a scan; mandatory types
    /// must be present. A country with fewer than two mandatory types is a
    /// configuration problem on the backend and is rejected.
    pub fn identity(types: &[IdentityType]) -> Result<Self, ValidationError> {
        let mandatory: Vec<&IdentityType> = types.iter().filter(|t| t.is_mandatory).collect();
        if mandatory.len() < 2 {
            return Err(ValidationError {
                record: RecordKey::new("country"),
                missing: Missing::Mapping(
                    "country must have at least 2 mandatory identity documents".to_owned(),
                ),
            });
        }
        let mut schema = Self::new(Section::Identity)
            .require_fields(["identity_file_number"])
            .require_slots([IDENTITY_DOCUMENT_SLOT]);
        for t in mandatory {
            schema = schema.require_record(t.identity_type_uuid.as_str());
        }
        Ok(schema)
    }

    /// Education levels mapped for a country: one record per level, one
    /// slot per mapped document.
    #[must_use]
    pub fn education(mappings: &[EducationMapping]) -> Self {
        let common = [
            "institution_name",
            "specialization",
            "year_of_passing",
            "percentage_cgpa",
        ];
        let grouped = lookup::group_by_level(mappings);
        let mut schema = Self::new(Section::Education).require_fields(common);
        for (level, rows) in &grouped {
            let slots = rows
                .iter()
                .filter(|r| r.is_mandatory)
                .map(|r| r.document_name.clone());
            schema = schema.for_record(level.as_str(), RecordRequirements::new(common, slots));
            let below: Vec<RecordKey> = lookup::levels_below(level)
                .iter()
                .filter(|l| grouped.contains_key(**l))
                .map(|l| RecordKey::new(*l))
                .collect();
            if !below.is_empty() {
                schema.prerequisites.insert(RecordKey::new(level.as_str()), below);
            }
        }
        schema
    }
}
