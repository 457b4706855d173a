//! Core identifier types with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated tab identifier.
    ///
    /// Tab IDs are opaque handles for the page context a video was detected
    /// in. They come from the page-feed collaborator and are never
    /// interpreted beyond equality.
    TabId, "tab ID"
);

define_string_id!(
    /// A validated watch session identifier.
    ///
    /// Session IDs are composed from the originating tab and the creation
    /// timestamp, so they are unique for the lifetime of the session table
    /// and are never reused.
    SessionId, "session ID"
);

impl SessionId {
    /// Composes a session ID from its tab and creation time.
    ///
    /// The creation timestamp is embedded in milliseconds, which keeps ids
    /// unique across rollovers on the same tab.
    pub fn compose(tab: &TabId, created_at: DateTime<Utc>) -> Self {
        Self(format!("{}-{}", tab.as_str(), created_at.timestamp_millis()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn tab_id_rejects_empty() {
        assert!(TabId::new("").is_err());
        assert!(TabId::new("42").is_ok());
    }

    #[test]
    fn session_id_rejects_empty() {
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("42-1700000000000").is_ok());
    }

    #[test]
    fn session_id_compose_embeds_tab_and_millis() {
        let tab = TabId::new("7").unwrap();
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let id = SessionId::compose(&tab, at);
        assert_eq!(id.as_str(), format!("7-{}", at.timestamp_millis()));
    }

    #[test]
    fn session_id_compose_differs_across_time() {
        let tab = TabId::new("7").unwrap();
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let t1 = t0 + chrono::Duration::milliseconds(1);
        assert_ne!(SessionId::compose(&tab, t0), SessionId::compose(&tab, t1));
    }

    #[test]
    fn session_id_serde_roundtrip() {
        let id = SessionId::new("3-1717243200000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"3-1717243200000\"");
        let parsed: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn session_id_serde_rejects_empty() {
        let result: Result<SessionId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}
