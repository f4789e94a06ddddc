//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different identifier kinds (e.g., using a
//! state key where a repository name is expected) and make the code more
//! self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A git commit SHA.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sha(pub String);

impl Sha {
    /// Creates a new Sha from a string.
    ///
    /// Note: This does not validate the format. Valid SHAs are 40 hex characters.
    pub fn new(s: impl Into<String>) -> Self {
        Sha(s.into())
    }

    /// Returns the SHA as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (7-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Sha {
    fn from(s: String) -> Self {
        Sha(s)
    }
}

impl From<&str> for Sha {
    fn from(s: &str) -> Self {
        Sha(s.to_string())
    }
}

/// Error returned when a repository name is not in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid repository {0:?}: expected \"owner/name\"")]
pub struct InvalidRepoId(pub String);

/// A repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parses `owner/name`, rejecting empty segments and extra slashes.
    pub fn parse(s: &str) -> Result<Self, InvalidRepoId> {
        let trimmed = s.trim();
        match trimmed.split_once('/') {
            Some((owner, repo))
                if !owner.is_empty()
                    && !repo.is_empty()
                    && !repo.contains('/')
                    && !trimmed.chars().any(char::is_whitespace) =>
            {
                Ok(RepoId::new(owner, repo))
            }
            _ => Err(InvalidRepoId(s.to_string())),
        }
    }
}

impl FromStr for RepoId {
    type Err = InvalidRepoId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepoId::parse(s)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// The key a subscription's tracking marker is stored under.
///
/// Release subscriptions use the bare `owner/name`; other modes append a
/// `:mode` suffix so a repository can be watched in both modes at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(pub String);

impl StateKey {
    pub fn new(s: impl Into<String>) -> Self {
        StateKey(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod sha {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn short_returns_7_chars(s in "[0-9a-f]{40}") {
                let sha = Sha::new(&s);
                prop_assert_eq!(sha.short(), &s[..7]);
            }
        }

        #[test]
        fn short_handles_short_input() {
            let sha = Sha::new("abc");
            assert_eq!(sha.short(), "abc");
        }
    }

    mod repo_id {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_accepts_display_output(
                owner in "[a-zA-Z][a-zA-Z0-9-]{0,38}",
                repo in "[a-zA-Z][a-zA-Z0-9_.-]{0,99}"
            ) {
                let id = RepoId::new(&owner, &repo);
                let parsed = RepoId::parse(&id.to_string()).unwrap();
                prop_assert_eq!(id, parsed);
            }
        }

        #[test]
        fn parse_trims_surrounding_whitespace() {
            let id = RepoId::parse("  rust-lang/rust \n").unwrap();
            assert_eq!(id, RepoId::new("rust-lang", "rust"));
        }

        #[test]
        fn parse_rejects_malformed_names() {
            for bad in ["", "rust", "/rust", "rust-lang/", "a/b/c", "a b/c"] {
                assert!(RepoId::parse(bad).is_err(), "accepted {bad:?}");
            }
        }
    }

    #[test]
    fn state_key_serializes_as_plain_string() {
        let key = StateKey::new("owner/repo:tag");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"owner/repo:tag\"");
    }
}
