//! Change detection for one subscription.
//!
//! Fetches the newest page of the upstream listing (conditionally on the stored
//! ETag), reconciles it against the stored marker, and proposes what is new.
//! Nothing here writes state: the run orchestrator decides what to persist
//! after delivery.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::reconcile::{Scan, apply_cutoff, scan};
use crate::effects::{GitHubEffect, GitHubInterpreter, Listing};
use crate::github::{GitHubApiError, GitHubErrorKind};
use crate::persistence::TrackingMarker;
use crate::types::{RemoteItem, Sha, Subscription, WatchMode};

/// How many listing entries are fetched per poll.
pub const LISTING_PAGE_SIZE: u8 = 30;

/// How the listing fetch went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A fresh listing was fetched and reconciled.
    Fetched,

    /// The upstream confirmed nothing changed since the stored cache token.
    NotModified,

    /// The fetch failed transiently (rate limit, non-2xx, network). Nothing
    /// should be written for this subscription.
    Skipped,
}

/// What one poll found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub outcome: PollOutcome,

    /// New items, newest first.
    pub new_items: Vec<RemoteItem>,

    /// Cache token to store if this result is committed. Carried over from the
    /// marker unless a fresh listing was fetched.
    pub cache_token: Option<String>,

    /// Set when the sentinel vanished and the cutoff left nothing: the newest
    /// visible item, to record as the new sentinel without notifying.
    pub rebaseline: Option<RemoteItem>,
}

impl ReconciliationResult {
    fn unchanged(outcome: PollOutcome, cache_token: Option<String>) -> Self {
        ReconciliationResult {
            outcome,
            new_items: Vec::new(),
            cache_token,
            rebaseline: None,
        }
    }

    fn fetched(new_items: Vec<RemoteItem>, cache_token: Option<String>) -> Self {
        ReconciliationResult {
            outcome: PollOutcome::Fetched,
            new_items,
            cache_token,
            rebaseline: None,
        }
    }
}

/// Detects new items for `subscription`.
///
/// Transient upstream conditions come back as an empty [`PollOutcome::Skipped`]
/// result. Only unusable responses (see [`GitHubErrorKind::Permanent`]) are
/// returned as errors.
pub async fn detect_changes<G>(
    github: &G,
    subscription: &Subscription,
    marker: Option<&TrackingMarker>,
) -> Result<ReconciliationResult, GitHubApiError>
where
    G: GitHubInterpreter<Error = GitHubApiError>,
{
    let stored_token = marker.and_then(|m| m.cache_token.clone());
    let effect = match subscription.mode {
        WatchMode::Release => GitHubEffect::ListReleases {
            per_page: LISTING_PAGE_SIZE,
            cache_token: stored_token.clone(),
        },
        WatchMode::Tag => GitHubEffect::ListTags {
            per_page: LISTING_PAGE_SIZE,
            cache_token: stored_token.clone(),
        },
    };
    let effect_name = effect.name();

    let listing = match github.interpret(effect).await {
        Ok(response) => response
            .into_listing()
            .ok_or_else(|| GitHubApiError::unexpected_response(effect_name))?,
        Err(e) => return skip_on_transient(subscription, e, stored_token),
    };

    let (items, cache_token) = match listing {
        Listing::NotModified => {
            debug!(repo = %subscription.repo, "Listing not modified");
            return Ok(ReconciliationResult::unchanged(
                PollOutcome::NotModified,
                stored_token,
            ));
        }
        Listing::Fetched { items, cache_token } => (items, cache_token),
    };

    let published: Vec<RemoteItem> = items.into_iter().filter(|i| !i.is_draft).collect();
    let newest_visible = published.first().cloned();
    let sentinel = marker.and_then(|m| m.last_identifier.as_deref());

    let candidates = match scan(published, sentinel) {
        Scan::Seeded(items) => {
            if let Some(item) = items.first() {
                info!(repo = %subscription.repo, baseline = %item.identifier, "First poll, seeding baseline");
            }
            return Ok(ReconciliationResult::fetched(items, cache_token));
        }
        Scan::SentinelFound(items) => {
            return Ok(ReconciliationResult::fetched(items, cache_token));
        }
        Scan::SentinelMissing(candidates) => candidates,
    };

    if candidates.is_empty() {
        return Ok(ReconciliationResult::fetched(Vec::new(), cache_token));
    }

    // `scan` only reports a missing sentinel when one was stored, so a marker exists.
    let cutoff = marker.map(TrackingMarker::cutoff).unwrap_or_else(Utc::now);
    warn!(
        repo = %subscription.repo,
        sentinel = sentinel.unwrap_or_default(),
        cutoff = %cutoff,
        "Last notified item not found in listing, using time cutoff"
    );

    let candidates = match subscription.mode {
        WatchMode::Release => candidates,
        WatchMode::Tag => match resolve_tag_timestamps(github, subscription, candidates).await? {
            Some(candidates) => candidates,
            // An unplaced tag may be new; retry the whole listing next poll.
            None => {
                return Ok(ReconciliationResult::unchanged(
                    PollOutcome::Skipped,
                    stored_token,
                ));
            }
        },
    };

    let new_items = apply_cutoff(candidates, cutoff);
    let mut result = ReconciliationResult::fetched(new_items, cache_token);
    if result.new_items.is_empty() {
        if let Some(item) = &newest_visible {
            info!(
                repo = %subscription.repo,
                rebaseline = %item.identifier,
                "Nothing newer than cutoff, moving sentinel to newest visible item"
            );
        }
        result.rebaseline = newest_visible;
    }
    Ok(result)
}

/// Fills in commit timestamps for tags so the cutoff can place them in time.
///
/// Returns `None` if any lookup fails transiently. A tag whose commit carries
/// no author time stays unset and is excluded by the cutoff.
async fn resolve_tag_timestamps<G>(
    github: &G,
    subscription: &Subscription,
    mut tags: Vec<RemoteItem>,
) -> Result<Option<Vec<RemoteItem>>, GitHubApiError>
where
    G: GitHubInterpreter<Error = GitHubApiError>,
{
    for tag in &mut tags {
        if tag.published_at.is_some() {
            continue;
        }
        let Some(sha) = tag.commit_sha.clone() else {
            continue;
        };
        match commit_time(github, &sha).await {
            Ok(time) => tag.published_at = time,
            Err(e) if e.kind.is_transient() => {
                warn!(
                    repo = %subscription.repo,
                    tag = %tag.identifier,
                    sha = %sha.short(),
                    error = %e,
                    "Commit lookup failed, skipping this poll"
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(Some(tags))
}

/// Looks up a commit's author time.
pub(crate) async fn commit_time<G>(
    github: &G,
    sha: &Sha,
) -> Result<Option<DateTime<Utc>>, GitHubApiError>
where
    G: GitHubInterpreter<Error = GitHubApiError>,
{
    let effect = GitHubEffect::GetCommit { sha: sha.clone() };
    let effect_name = effect.name();
    let commit = github
        .interpret(effect)
        .await?
        .into_commit()
        .ok_or_else(|| GitHubApiError::unexpected_response(effect_name))?;
    Ok(commit.authored_at)
}

fn skip_on_transient(
    subscription: &Subscription,
    err: GitHubApiError,
    stored_token: Option<String>,
) -> Result<ReconciliationResult, GitHubApiError> {
    match err.kind {
        GitHubErrorKind::RateLimited => match err.rate_limit_wait(Utc::now()) {
            Some(secs) => warn!(repo = %subscription.repo, reset_in_secs = secs, "Rate limited"),
            None => warn!(repo = %subscription.repo, "Rate limited"),
        },
        GitHubErrorKind::Transient => {
            error!(repo = %subscription.repo, error = %err, "Listing fetch failed");
        }
        GitHubErrorKind::Permanent => return Err(err),
    }
    Ok(ReconciliationResult::unchanged(
        PollOutcome::Skipped,
        stored_token,
    ))
}
