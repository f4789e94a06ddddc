//! JSON shapes of the REST responses the relay reads.
//!
//! Only the fields the relay uses are declared; serde ignores the rest.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::types::{CommitInfo, RemoteItem, RepoId, Sha};

const GITHUB_WEB_URL: &str = "https://github.com";

/// An element of `GET /repos/{owner}/{repo}/releases`.
#[derive(Debug, Deserialize)]
pub struct ReleaseWire {
    pub tag_name: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    /// Null for drafts.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
}

impl From<ReleaseWire> for RemoteItem {
    fn from(wire: ReleaseWire) -> Self {
        RemoteItem::release(
            wire.tag_name,
            wire.body.unwrap_or_default(),
            wire.html_url,
            wire.published_at,
        )
        .with_draft(wire.draft)
        .with_prerelease(wire.prerelease)
    }
}

/// An element of `GET /repos/{owner}/{repo}/tags`.
#[derive(Debug, Deserialize)]
pub struct TagWire {
    pub name: String,
    pub commit: ObjectRef,
}

#[derive(Debug, Deserialize)]
pub struct ObjectRef {
    pub sha: String,
}

impl TagWire {
    pub fn into_item(self, repo: &RepoId) -> RemoteItem {
        let url = format!(
            "{}/{}/releases/tag/{}",
            GITHUB_WEB_URL,
            repo,
            urlencoding::encode(&self.name)
        );
        RemoteItem::tag(self.name, Sha::new(self.commit.sha), url)
    }
}

/// A commit as returned by the commits and compare endpoints.
#[derive(Debug, Deserialize)]
pub struct CommitWire {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<Signature>,
    #[serde(default)]
    pub committer: Option<Signature>,
}

#[derive(Debug, Deserialize)]
pub struct Signature {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl From<CommitWire> for CommitInfo {
    fn from(wire: CommitWire) -> Self {
        let authored_at = wire
            .commit
            .author
            .and_then(|s| s.date)
            .or_else(|| wire.commit.committer.and_then(|s| s.date));
        CommitInfo {
            sha: Sha::new(wire.sha),
            message: wire.commit.message,
            authored_at,
        }
    }
}

/// `GET /repos/{owner}/{repo}/compare/{base}...{head}`.
#[derive(Debug, Deserialize)]
pub struct CompareWire {
    #[serde(default)]
    pub commits: Vec<CommitWire>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_release_without_publish_date_decodes() {
        let json = r#"{
            "tag_name": "v2.0.0-rc.1",
            "name": null,
            "body": null,
            "html_url": "https://github.com/o/r/releases/tag/v2.0.0-rc.1",
            "published_at": null,
            "draft": true,
            "prerelease": true
        }"#;
        let item: RemoteItem = serde_json::from_str::<ReleaseWire>(json).unwrap().into();

        assert_eq!(item.identifier, "v2.0.0-rc.1");
        assert!(item.body.is_empty());
        assert!(item.published_at.is_none());
        assert!(item.is_draft);
        assert!(item.is_prerelease);
    }

    #[test]
    fn tag_url_points_at_release_page() {
        let wire: TagWire =
            serde_json::from_str(r#"{"name":"v1.0.0","commit":{"sha":"abc123"}}"#).unwrap();
        let item = wire.into_item(&RepoId::new("o", "r"));

        assert_eq!(item.url, "https://github.com/o/r/releases/tag/v1.0.0");
        assert_eq!(item.commit_sha, Some(Sha::new("abc123")));
    }

    #[test]
    fn commit_falls_back_to_committer_date() {
        let json = r#"{
            "sha": "abc",
            "commit": {
                "message": "feat: x",
                "author": {"name": "a"},
                "committer": {"date": "2025-03-01T09:00:00Z"}
            }
        }"#;
        let commit: CommitInfo = serde_json::from_str::<CommitWire>(json).unwrap().into();

        assert_eq!(
            commit.authored_at,
            DateTime::from_timestamp(1_740_819_600, 0)
        );
    }
}
