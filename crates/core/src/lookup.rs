//! Lookup data served by the backend: countries and the per-country
//! document mappings that drive the identity and education sections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Education levels from lowest to highest. Levels not listed sort after
/// these, alphabetically.
pub const EDUCATION_HIERARCHY: [&str; 6] = [
    "10th",
    "12th",
    "Diploma",
    "Bachelor's Degree",
    "Master's Degree",
    "Doctorate",
];

/// A country entry from the masters list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub country_uuid: String,
    pub country_name: String,
    #[serde(default)]
    pub is_active: bool,
}

/// An identity document type required (or accepted) for a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityType {
    pub identity_type_uuid: String,
    pub identity_type_name: String,
    #[serde(default)]
    pub is_mandatory: bool,
}

/// One document expected for an education level in a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationMapping {
    pub mapping_uuid: String,
    pub education_name: String,
    pub document_name: String,
    #[serde(default)]
    pub is_mandatory: bool,
}

/// Group mapping rows by education level, preserving row order.
#[must_use]
pub fn group_by_level(rows: &[EducationMapping]) -> BTreeMap<String, Vec<EducationMapping>> {
    let mut grouped: BTreeMap<String, Vec<EducationMapping>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.education_name.clone())
            .or_default()
            .push(row.clone());
    }
    grouped
}

/// Sort education levels lowest first.
pub fn sort_levels(levels: &mut [String]) {
    levels.sort_by(|a, b| {
        let rank = |level: &str| EDUCATION_HIERARCHY.iter().position(|l| *l == level);
        match (rank(a), rank(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    });
}

/// Levels of the hierarchy strictly below `level`.
#[must_use]
pub fn levels_below(level: &str) -> &'static [&'static str] {
    match EDUCATION_HIERARCHY.iter().position(|l| *l == level) {
        Some(idx) => &EDUCATION_HIERARCHY[..idx],
        None => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(level: &str, doc: &str) -> EducationMapping {
        EducationMapping {
            mapping_uuid: format!("{level}-{doc}"),
            education_name: level.into(),
            document_name: doc.into(),
            is_mandatory: true,
        }
    }

    #[test]
    fn groups_rows_by_level() {
        let rows = vec![
            row("10th", "marksheet"),
            row("12th", "marksheet"),
            row("10th", "certificate"),
        ];
        let grouped = group_by_level(&rows);
        assert_eq!(grouped["10th"].len(), 2);
        assert_eq!(grouped["10th"][1].document_name, "certificate");
        assert_eq!(grouped["12th"].len(), 1);
    }

    #[test]
    fn sorts_known_levels_first() {
        let mut levels = vec![
            "Certification".to_owned(),
            "Master's Degree".to_owned(),
            "10th".to_owned(),
            "Apprenticeship".to_owned(),
        ];
        sort_levels(&mut levels);
        assert_eq!(
            levels,
            ["10th", "Master's Degree", "Apprenticeship", "Certification"]
        );
    }

    #[test]
    fn levels_below_unknown_is_empty() {
        assert_eq!(levels_below("12th"), &["10th"]);
        assert!(levels_below("Certification").is_empty());
    }

    #[test]
    fn country_defaults_inactive() {
        let c: Country =
            serde_json::from_str(r#"{"country_uuid":"in","country_name":"India"}"#).unwrap();
        assert!(!c.is_active);
    }
}
