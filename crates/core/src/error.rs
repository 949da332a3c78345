use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RecordKey;

/// What a record is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Missing {
    /// A mandatory field is unset or blank.
    Field(String),
    /// A mandatory attachment slot has neither a pending file nor a server path.
    Slot(String),
    /// A lower education level must be filled in first.
    Prerequisite(String),
    /// The lookup data for the section is unusable.
    Mapping(String),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "field `{name}`"),
            Self::Slot(name) => write!(f, "document `{name}`"),
            Self::Prerequisite(level) => write!(f, "prerequisite `{level}`"),
            Self::Mapping(reason) => f.write_str(reason),
        }
    }
}

/// A local, correctable validation failure that blocks a section sync.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("record `{record}` is incomplete: missing {missing}")]
pub struct ValidationError {
    pub record: RecordKey,
    pub missing: Missing,
}

impl ValidationError {
    #[must_use]
    pub fn field(record: impl Into<RecordKey>, name: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            missing: Missing::Field(name.into()),
        }
    }

    #[must_use]
    pub fn slot(record: impl Into<RecordKey>, name: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            missing: Missing::Slot(name.into()),
        }
    }

    /// Name of the offending field, slot or level.
    #[must_use]
    pub fn missing_name(&self) -> &str {
        match &self.missing {
            Missing::Field(n)
            | Missing::Slot(n)
            | Missing::Prerequisite(n)
            | Missing::Mapping(n) => n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_the_slot() {
        let err = ValidationError::slot("passport", "passport_scan");
        assert_eq!(
            err.to_string(),
            "record `passport` is incomplete: missing document `passport_scan`"
        );
        assert_eq!(err.missing_name(), "passport_scan");
    }

    #[test]
    fn missing_serde_is_tagged() {
        let json = serde_json::to_string(&Missing::Field("city".into())).unwrap();
        assert_eq!(json, r#"{"kind":"field","name":"city"}"#);
    }
}
