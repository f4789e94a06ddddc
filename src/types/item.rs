//! Upstream releases and tags, normalized into one shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::Sha;

/// A release or tag as seen in an upstream listing.
///
/// Tags carry no timestamp in the listing response; `published_at` stays `None`
/// until a commit lookup fills it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Tag name. This is what the tracking marker records.
    pub identifier: String,

    /// Release notes, or synthesized commit log for tags. May be empty.
    pub body: String,

    /// Link to the item on the web.
    pub url: String,

    pub published_at: Option<DateTime<Utc>>,

    /// Commit the tag points to (tags only).
    pub commit_sha: Option<Sha>,

    pub is_draft: bool,
    pub is_prerelease: bool,
}

impl RemoteItem {
    pub fn release(
        identifier: impl Into<String>,
        body: impl Into<String>,
        url: impl Into<String>,
        published_at: Option<DateTime<Utc>>,
    ) -> Self {
        RemoteItem {
            identifier: identifier.into(),
            body: body.into(),
            url: url.into(),
            published_at,
            commit_sha: None,
            is_draft: false,
            is_prerelease: false,
        }
    }

    pub fn tag(identifier: impl Into<String>, commit_sha: Sha, url: impl Into<String>) -> Self {
        RemoteItem {
            identifier: identifier.into(),
            body: String::new(),
            url: url.into(),
            published_at: None,
            commit_sha: Some(commit_sha),
            is_draft: false,
            is_prerelease: false,
        }
    }

    pub fn with_draft(mut self, is_draft: bool) -> Self {
        self.is_draft = is_draft;
        self
    }

    pub fn with_prerelease(mut self, is_prerelease: bool) -> Self {
        self.is_prerelease = is_prerelease;
        self
    }
}

/// A single commit, as returned by the compare and commits endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: Sha,
    pub message: String,
    pub authored_at: Option<DateTime<Utc>>,
}

impl CommitInfo {
    /// The first non-blank line of the commit message.
    pub fn summary(&self) -> &str {
        self.message
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_skips_leading_blank_lines() {
        let commit = CommitInfo {
            sha: Sha::new("a".repeat(40)),
            message: "\n\n  fix: handle empty body  \n\nLonger explanation".to_string(),
            authored_at: None,
        };
        assert_eq!(commit.summary(), "fix: handle empty body");
    }

    #[test]
    fn summary_of_empty_message_is_empty() {
        let commit = CommitInfo {
            sha: Sha::new("b".repeat(40)),
            message: String::new(),
            authored_at: None,
        };
        assert_eq!(commit.summary(), "");
    }

    #[test]
    fn tag_constructor_leaves_timestamp_unresolved() {
        let item = RemoteItem::tag("v1.0.0", Sha::new("c".repeat(40)), "https://example.test");
        assert!(item.published_at.is_none());
        assert!(item.body.is_empty());
        assert!(!item.is_draft);
    }
}
