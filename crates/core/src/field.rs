use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Named field values of a single record.
pub type Fields = BTreeMap<String, FieldValue>;

/// A typed form value.
///
/// `Unset` is distinct from an explicit zero: `Number(0)` is a real value
/// and never counts as empty. On the wire `Unset` is JSON `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
    #[default]
    Unset,
}

impl FieldValue {
    /// Build a text value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Build an integer value.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::Number(value.into())
    }

    /// Parse raw form input.
    ///
    /// Blank input is `Unset`, `true`/`false` become flags, plain integers
    /// become numbers and everything else stays text. Leading zeros are kept
    /// as text so postal codes and phone numbers survive untouched.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Unset;
        }
        match trimmed {
            "true" => return Self::Flag(true),
            "false" => return Self::Flag(false),
            _ => {}
        }
        let leading_zero = trimmed.len() > 1 && trimmed.starts_with('0');
        if !leading_zero {
            if let Ok(n) = trimmed.parse::<i64>() {
                return Self::integer(n);
            }
        }
        Self::Text(raw.to_owned())
    }

    /// Returns `true` for `Unset` and blank text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Unset => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Flag(_) | Self::Number(_) => false,
        }
    }

    /// Returns the flag value, treating `1`/`"1"`/`"true"` as set.
    #[must_use]
    pub fn as_flag(&self) -> bool {
        match self {
            Self::Flag(b) => *b,
            Self::Number(n) => n.as_i64() == Some(1),
            Self::Text(s) => matches!(s.trim(), "1" | "true"),
            Self::Unset => false,
        }
    }

    /// Canonical text form used for comparisons and form encoding.
    ///
    /// Empty values have no canonical form, so `Unset` and `""` compare
    /// equal while `0` and `""` do not.
    #[must_use]
    pub fn canonical(&self) -> Option<String> {
        match self {
            Self::Flag(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_owned())
            }
            Self::Unset => None,
        }
    }

    /// Value equality across representations (`2020` equals `"2020"`).
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical() {
            Some(s) => f.write_str(&s),
            None => Ok(()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::integer(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::integer(n.into())
    }
}
