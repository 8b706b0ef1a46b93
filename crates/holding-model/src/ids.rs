//! Opaque identifiers
//!
//! User ids come from the auth provider, recommendation ids and document
//! keys from the recommendation source. None of them are interpreted here;
//! they are compared, hashed and printed.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier
            #[inline]
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow the raw identifier
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True if the identifier is empty
            #[inline]
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// User identifier issued by the auth provider
    UserId
);

string_id!(
    /// Session whose analysis produced a recommendation catalog
    SessionId
);

string_id!(
    /// Identifier of a single issued recommendation
    RecommendationId
);

string_id!(
    /// Stable key of a recommended document, unique per user
    DocumentKey
);

impl UserId {
    /// Generate a random user id (tests and local fixtures)
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_raw_value() {
        let key = DocumentKey::new("doc_rg_cpf");
        assert_eq!(key.to_string(), "doc_rg_cpf");
        assert_eq!(key.as_str(), "doc_rg_cpf");
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = UserId::from("user-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"user-1\"");

        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn random_user_ids_differ() {
        assert_ne!(UserId::random(), UserId::random());
    }
}
