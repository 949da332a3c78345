use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! newtype_string {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Return the inner string as a str slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    SessionToken,
    "Opaque onboarding link token. Scopes every persisted draft."
);
newtype_string!(UserId, "Stable user identifier resolved from a session token.");
newtype_string!(
    RemoteId,
    "Identifier assigned by the backend on the first successful create."
);
newtype_string!(
    RecordKey,
    "Stable, human-meaningful key of a sub-record inside a section."
);

/// A step of the onboarding flow that owns its own draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Personal,
    Address,
    Identity,
    Education,
    Experience,
}

impl Section {
    /// Every section, in flow order.
    pub const ALL: [Section; 5] = [
        Self::Personal,
        Self::Address,
        Self::Identity,
        Self::Education,
        Self::Experience,
    ];

    /// Return a string representation of the section.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Address => "address",
            Self::Identity => "identity",
            Self::Education => "education",
            Self::Experience => "experience",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| format!("unknown section: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_from_str() {
        let token = SessionToken::from("tok-1");
        assert_eq!(token.as_str(), "tok-1");
        assert_eq!(&*token, "tok-1");
    }

    #[test]
    fn newtype_serde_is_transparent() {
        let id = RemoteId::new("doc-123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"doc-123\"");
        let back: RemoteId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn section_as_str_and_parse() {
        for section in Section::ALL {
            assert_eq!(section.as_str().parse::<Section>(), Ok(section));
        }
        assert!("payroll".parse::<Section>().is_err());
    }

    #[test]
    fn section_serde_snake_case() {
        let json = serde_json::to_string(&Section::Experience).unwrap();
        assert_eq!(json, "\"experience\"");
    }
}
