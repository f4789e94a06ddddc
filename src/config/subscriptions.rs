//! The subscription list file.
//!
//! ```json
//! {"repos": ["tokio-rs/tokio", {"repo": "rust-lang/rust", "mode": "tag"}]}
//! ```
//!
//! Bare strings follow releases.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use super::ConfigError;
use crate::types::{RepoId, Subscription, WatchMode};

#[derive(Debug, Deserialize)]
struct SubscriptionFile {
    repos: Vec<SubscriptionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubscriptionEntry {
    Bare(String),
    Detailed {
        repo: String,
        #[serde(default)]
        mode: WatchMode,
    },
}

impl SubscriptionEntry {
    fn into_subscription(self) -> Result<Subscription, ConfigError> {
        let (raw, mode) = match self {
            SubscriptionEntry::Bare(repo) => (repo, WatchMode::Release),
            SubscriptionEntry::Detailed { repo, mode } => (repo, mode),
        };
        let repo = RepoId::parse(&raw)
            .map_err(|source| ConfigError::InvalidRepo { entry: raw, source })?;
        Ok(Subscription::new(repo, mode))
    }
}

/// Parses a subscription list read from `origin`.
///
/// Entries that map to the same state key are kept once, first wins.
pub fn parse_subscriptions(json: &str, origin: &Path) -> Result<Vec<Subscription>, ConfigError> {
    let file: SubscriptionFile =
        serde_json::from_str(json).map_err(|source| ConfigError::ParseSubscriptions {
            path: origin.to_path_buf(),
            source,
        })?;

    let mut seen = HashSet::new();
    let mut subscriptions = Vec::with_capacity(file.repos.len());
    for entry in file.repos {
        let subscription = entry.into_subscription()?;
        if seen.insert(subscription.state_key()) {
            subscriptions.push(subscription);
        }
    }
    Ok(subscriptions)
}

/// Reads and parses the subscription list at `path`.
pub fn load_subscriptions(path: &Path) -> Result<Vec<Subscription>, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadSubscriptions {
        path: path.to_path_buf(),
        source,
    })?;
    parse_subscriptions(&json, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(json: &str) -> Result<Vec<Subscription>, ConfigError> {
        parse_subscriptions(json, Path::new("subscribe.json"))
    }

    #[test]
    fn bare_strings_follow_releases() {
        let subs = parse(r#"{"repos": ["tokio-rs/tokio"]}"#).unwrap();
        assert_eq!(subs, vec![Subscription::release(RepoId::new("tokio-rs", "tokio"))]);
    }

    #[test]
    fn detailed_entries_choose_mode() {
        let subs = parse(
            r#"{"repos": [
                {"repo": "rust-lang/rust", "mode": "tag"},
                {"repo": "serde-rs/serde"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            subs,
            vec![
                Subscription::tag(RepoId::new("rust-lang", "rust")),
                Subscription::release(RepoId::new("serde-rs", "serde")),
            ]
        );
    }

    #[test]
    fn same_repo_in_both_modes_is_two_subscriptions() {
        let subs = parse(r#"{"repos": ["a/b", {"repo": "a/b", "mode": "tag"}, "a/b"]}"#).unwrap();
        assert_eq!(subs.len(), 2);
    }

    #[test]
    fn invalid_repo_is_reported() {
        let err = parse(r#"{"repos": ["not-a-repo"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRepo { entry, .. } if entry == "not-a-repo"));
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let err = parse(r#"{"repos": [{"repo": "a/b", "mode": "branch"}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ParseSubscriptions { .. }));
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");

        let err = load_subscriptions(&path).unwrap_err();

        assert!(matches!(err, ConfigError::ReadSubscriptions { path: p, .. } if p == path));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"repos": ["octo/widgets"]}}"#).unwrap();

        let subs = load_subscriptions(file.path()).unwrap();

        assert_eq!(subs, vec![Subscription::release(RepoId::new("octo", "widgets"))]);
    }
}
