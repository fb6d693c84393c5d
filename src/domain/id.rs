//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
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
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Tradable contract (CLOB token) identifier.
    ///
    /// This is the id the feed keys its messages by.
    TokenId
);

string_id!(
    /// Condition identifier of the market a contract belongs to.
    ConditionId
);

string_id!(
    /// Stable key of an event basket within one universe.
    BasketKey
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_id_new_and_as_str() {
        let id = TokenId::new("test-token");
        assert_eq!(id.as_str(), "test-token");
    }

    #[test]
    fn basket_key_display() {
        let key = BasketKey::from("fed-december");
        assert_eq!(format!("{key}"), "fed-december");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&ConditionId::new("0xabc")).unwrap();
        assert_eq!(json, "\"0xabc\"");

        let back: ConditionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "0xabc");
    }
}
