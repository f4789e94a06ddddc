//! GitHub effect interpreter using octocrab.
//!
//! Key implementation details:
//! - Listings are conditional on the stored ETag; a 304 is a successful
//!   [`Listing::NotModified`], not an error
//! - Every other non-2xx status is categorized by [`classify_failure`]
//! - No retries: a failed call is skipped until the next poll

use serde::de::DeserializeOwned;

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse, Listing};
use crate::types::{CommitInfo, RemoteItem, Sha};

use super::client::{OctocrabClient, RawResponse};
use super::error::{GitHubApiError, classify_failure};
use super::wire::{CommitWire, CompareWire, ReleaseWire, TagWire};

impl GitHubInterpreter for OctocrabClient {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
        interpret_github_effect(self, effect).await
    }
}

/// Executes a single effect against the GitHub API.
pub async fn interpret_github_effect(
    client: &OctocrabClient,
    effect: GitHubEffect,
) -> Result<GitHubResponse, GitHubApiError> {
    match effect {
        GitHubEffect::ListReleases {
            per_page,
            cache_token,
        } => list_releases(client, per_page, cache_token.as_deref()).await,
        GitHubEffect::ListTags {
            per_page,
            cache_token,
        } => list_tags(client, per_page, cache_token.as_deref()).await,
        GitHubEffect::CompareCommits { base, head } => {
            compare_commits(client, &base, &head).await
        }
        GitHubEffect::ListCommits {
            reference,
            per_page,
        } => list_commits(client, &reference, per_page).await,
        GitHubEffect::GetCommit { sha } => get_commit(client, &sha).await,
    }
}

// ─── Listings ─────────────────────────────────────────────────────────────────

async fn list_releases(
    client: &OctocrabClient,
    per_page: u8,
    cache_token: Option<&str>,
) -> Result<GitHubResponse, GitHubApiError> {
    let route = format!("{}/releases?per_page={}", client.repo_route(), per_page);
    let response = client.get_raw(&route, cache_token).await?;

    let Some((releases, etag)) = decode_listing::<Vec<ReleaseWire>>(response, "releases")? else {
        return Ok(GitHubResponse::Listing(Listing::NotModified));
    };

    Ok(GitHubResponse::Listing(Listing::Fetched {
        items: releases.into_iter().map(RemoteItem::from).collect(),
        cache_token: etag,
    }))
}

async fn list_tags(
    client: &OctocrabClient,
    per_page: u8,
    cache_token: Option<&str>,
) -> Result<GitHubResponse, GitHubApiError> {
    let route = format!("{}/tags?per_page={}", client.repo_route(), per_page);
    let response = client.get_raw(&route, cache_token).await?;

    let Some((tags, etag)) = decode_listing::<Vec<TagWire>>(response, "tags")? else {
        return Ok(GitHubResponse::Listing(Listing::NotModified));
    };

    let repo = client.repo();
    Ok(GitHubResponse::Listing(Listing::Fetched {
        items: tags.into_iter().map(|t| t.into_item(repo)).collect(),
        cache_token: etag,
    }))
}

/// Returns `None` for 304, the decoded body and ETag for 2xx, an error otherwise.
fn decode_listing<T: DeserializeOwned>(
    response: RawResponse,
    what: &str,
) -> Result<Option<(T, Option<String>)>, GitHubApiError> {
    if response.status == http::StatusCode::NOT_MODIFIED {
        return Ok(None);
    }
    let etag = response.etag();
    let body = decode_success(response, what)?;
    Ok(Some((body, etag)))
}

// ─── Commits ──────────────────────────────────────────────────────────────────

async fn compare_commits(
    client: &OctocrabClient,
    base: &str,
    head: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    let route = format!(
        "{}/compare/{}...{}",
        client.repo_route(),
        urlencoding::encode(base),
        urlencoding::encode(head)
    );
    let response = client.get_raw(&route, None).await?;
    let compare: CompareWire = decode_success(response, "comparison")?;

    Ok(GitHubResponse::Commits(
        compare.commits.into_iter().map(CommitInfo::from).collect(),
    ))
}

async fn list_commits(
    client: &OctocrabClient,
    reference: &str,
    per_page: u8,
) -> Result<GitHubResponse, GitHubApiError> {
    let route = format!(
        "{}/commits?sha={}&per_page={}",
        client.repo_route(),
        urlencoding::encode(reference),
        per_page
    );
    let response = client.get_raw(&route, None).await?;
    let commits: Vec<CommitWire> = decode_success(response, "commit history")?;

    Ok(GitHubResponse::Commits(
        commits.into_iter().map(CommitInfo::from).collect(),
    ))
}

async fn get_commit(client: &OctocrabClient, sha: &Sha) -> Result<GitHubResponse, GitHubApiError> {
    let route = format!(
        "{}/commits/{}",
        client.repo_route(),
        urlencoding::encode(sha.as_str())
    );
    let response = client.get_raw(&route, None).await?;
    let commit: CommitWire = decode_success(response, "commit")?;

    Ok(GitHubResponse::Commit(commit.into()))
}

fn decode_success<T: DeserializeOwned>(
    response: RawResponse,
    what: &str,
) -> Result<T, GitHubApiError> {
    if !response.status.is_success() {
        return Err(classify_failure(
            response.status,
            &response.headers,
            &response.body,
        ));
    }
    serde_json::from_str(&response.body).map_err(|e| GitHubApiError::decode(what, e))
}
