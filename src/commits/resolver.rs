//! Synthetic release notes for tags.
//!
//! Tags carry no notes of their own, so each new tag gets a bullet list of the
//! commits it introduced. Consecutive new tags are compared pairwise, so each
//! commit appears under exactly one tag.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::detect::detector::commit_time;
use crate::effects::{GitHubEffect, GitHubInterpreter};
use crate::github::GitHubApiError;
use crate::types::{CommitInfo, RemoteItem, Subscription};

/// Most commits listed for a single tag.
pub const MAX_TAG_COMMITS: usize = 50;

/// Fills in bodies and timestamps for newly detected tags.
///
/// `new_tags` is newest first, as detected; the result is oldest first.
/// `previous_tag` is the last tag notified about, if any. Transient lookup
/// failures leave a tag with an empty body; only permanent errors are returned.
pub async fn resolve_tag_bodies<G>(
    github: &G,
    subscription: &Subscription,
    new_tags: Vec<RemoteItem>,
    previous_tag: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<RemoteItem>, GitHubApiError>
where
    G: GitHubInterpreter<Error = GitHubApiError>,
{
    let mut resolved = Vec::with_capacity(new_tags.len());
    let mut base = previous_tag.map(str::to_string);

    for mut tag in new_tags.into_iter().rev() {
        let commits = commits_since(github, subscription, base.as_deref(), &tag.identifier).await?;
        debug!(
            repo = %subscription.repo,
            tag = %tag.identifier,
            base = base.as_deref().unwrap_or("<history>"),
            commits = commits.len(),
            "Resolved tag commits"
        );
        tag.body = synthesize_body(&commits);

        if tag.published_at.is_none() {
            let looked_up = match &tag.commit_sha {
                Some(sha) => match commit_time(github, sha).await {
                    Ok(time) => time,
                    Err(e) if e.kind.is_transient() => {
                        warn!(
                            repo = %subscription.repo,
                            sha = %sha.short(),
                            error = %e,
                            "Commit lookup failed, using current time"
                        );
                        None
                    }
                    Err(e) => return Err(e),
                },
                None => None,
            };
            tag.published_at = Some(looked_up.unwrap_or(now));
        }

        base = Some(tag.identifier.clone());
        resolved.push(tag);
    }

    Ok(resolved)
}

/// Commits introduced by `head`, oldest first, capped at [`MAX_TAG_COMMITS`].
async fn commits_since<G>(
    github: &G,
    subscription: &Subscription,
    base: Option<&str>,
    head: &str,
) -> Result<Vec<CommitInfo>, GitHubApiError>
where
    G: GitHubInterpreter<Error = GitHubApiError>,
{
    let effect = match base {
        Some(base) => GitHubEffect::CompareCommits {
            base: base.to_string(),
            head: head.to_string(),
        },
        None => GitHubEffect::ListCommits {
            reference: head.to_string(),
            per_page: MAX_TAG_COMMITS as u8,
        },
    };
    let effect_name = effect.name();

    let mut commits = match github.interpret(effect).await {
        Ok(response) => response
            .into_commits()
            .ok_or_else(|| GitHubApiError::unexpected_response(effect_name))?,
        Err(e) if e.kind.is_transient() => {
            warn!(repo = %subscription.repo, tag = head, error = %e, "Commit range lookup failed");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    if base.is_none() {
        // History comes newest first.
        commits.reverse();
    }
    let excess = commits.len().saturating_sub(MAX_TAG_COMMITS);
    commits.drain(..excess);
    Ok(commits)
}

/// One `- <summary>` line per commit.
pub fn synthesize_body(commits: &[CommitInfo]) -> String {
    commits
        .iter()
        .map(CommitInfo::summary)
        .filter(|summary| !summary.is_empty())
        .map(|summary| format!("- {summary}"))
        .collect::<Vec<_>>()
        .join("\n")
}
