//! Newtype wrappers for repository identifiers and revisions.
//!
//! Both serialize/deserialize as plain strings so lock files stay compatible
//! with the `hf cache ls --format json` record layout.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Branch requested when a manifest entry carries no `ref`.
pub const DEFAULT_REVISION: &str = "main";

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
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
    };
}

string_newtype!(
    /// Remote repository identifier, e.g. `org/model`.
    RepoId
);

string_newtype!(
    /// A revision to request: a named ref (`main`, `v1`) or a commit hash.
    /// Treated as opaque everywhere.
    Revision
);

impl RepoId {
    /// A usable repository id is non-empty and has no whitespace.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && !self.0.chars().any(char::is_whitespace)
    }
}

impl Revision {
    pub fn default_branch() -> Self {
        Self::new(DEFAULT_REVISION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_id_display_and_as_ref() {
        let id = RepoId::new("org/model");
        assert_eq!(id.to_string(), "org/model");
        assert_eq!(id.as_str(), "org/model");
        assert_eq!(AsRef::<str>::as_ref(&id), "org/model");
    }

    #[test]
    fn repo_id_validity() {
        assert!(RepoId::new("org/model").is_valid());
        assert!(!RepoId::new("").is_valid());
        assert!(!RepoId::new("org/my model").is_valid());
        assert!(!RepoId::new("org/model\t").is_valid());
    }

    #[test]
    fn revision_serializes_as_plain_string() {
        let rev = Revision::new("abc123");
        let json = serde_json::to_string(&rev).unwrap();
        assert_eq!(json, "\"abc123\"");
    }

    #[test]
    fn default_branch_is_main() {
        assert_eq!(Revision::default_branch(), "main");
    }
}
