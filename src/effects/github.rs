//! GitHub API effect types.
//!
//! These types describe GitHub API reads as data, without executing them.
//! The octocrab-backed interpreter in `crate::github` executes them; tests use
//! scripted interpreters instead.

use serde::{Deserialize, Serialize};

use crate::types::{CommitInfo, RemoteItem, Sha};

/// A GitHub API effect.
///
/// Effects are repo-scoped: the interpreter is constructed for one `RepoId`,
/// so effects don't include it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubEffect {
    // ─── Listings ─────────────────────────────────────────────────────────────
    /// Fetch the newest page of releases.
    ///
    /// When `cache_token` is set it is sent as `If-None-Match`, and an
    /// unchanged listing comes back as [`Listing::NotModified`].
    ListReleases {
        per_page: u8,
        cache_token: Option<String>,
    },

    /// Fetch the newest page of tags, with the same conditional semantics.
    ListTags {
        per_page: u8,
        cache_token: Option<String>,
    },

    // ─── Commits ──────────────────────────────────────────────────────────────
    /// Commits reachable from `head` but not from `base`, oldest first.
    CompareCommits { base: String, head: String },

    /// The most recent commits reachable from `reference`, newest first.
    ListCommits { reference: String, per_page: u8 },

    /// A single commit by SHA.
    GetCommit { sha: Sha },
}

impl GitHubEffect {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            GitHubEffect::ListReleases { .. } => "list_releases",
            GitHubEffect::ListTags { .. } => "list_tags",
            GitHubEffect::CompareCommits { .. } => "compare_commits",
            GitHubEffect::ListCommits { .. } => "list_commits",
            GitHubEffect::GetCommit { .. } => "get_commit",
        }
    }
}

/// Result of a conditional listing fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Listing {
    /// The upstream confirmed the cached listing is still current (HTTP 304).
    NotModified,

    /// A fresh listing, newest first.
    Fetched {
        items: Vec<RemoteItem>,
        /// ETag of this response, to send on the next fetch.
        cache_token: Option<String>,
    },
}

/// Response from executing a GitHub effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubResponse {
    /// Response to `ListReleases` and `ListTags`.
    Listing(Listing),

    /// Response to `CompareCommits` and `ListCommits`.
    Commits(Vec<CommitInfo>),

    /// Response to `GetCommit`.
    Commit(CommitInfo),
}

impl GitHubResponse {
    pub fn into_listing(self) -> Option<Listing> {
        match self {
            GitHubResponse::Listing(listing) => Some(listing),
            _ => None,
        }
    }

    pub fn into_commits(self) -> Option<Vec<CommitInfo>> {
        match self {
            GitHubResponse::Commits(commits) => Some(commits),
            _ => None,
        }
    }

    pub fn into_commit(self) -> Option<CommitInfo> {
        match self {
            GitHubResponse::Commit(commit) => Some(commit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_serializes_with_type_tag() {
        let effect = GitHubEffect::CompareCommits {
            base: "v1".into(),
            head: "v2".into(),
        };
        let json = serde_json::to_value(&effect).unwrap();
        assert_eq!(json["type"], "compare_commits");
        assert_eq!(json["base"], "v1");
    }

    #[test]
    fn response_accessors_reject_other_variants() {
        let response = GitHubResponse::Listing(Listing::NotModified);
        assert!(response.clone().into_commits().is_none());
        assert!(response.clone().into_commit().is_none());
        assert_eq!(response.into_listing(), Some(Listing::NotModified));
    }
}
