//! Shared test utilities, scripted fakes, and generators for property-based testing.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, TimeZone, Utc};
use http::StatusCode;
use proptest::prelude::*;

use crate::categorize::{CategorizeError, Categorizer, CategoryGroup};
use crate::effects::{GitHubConnector, GitHubEffect, GitHubInterpreter, GitHubResponse, Listing};
use crate::github::GitHubApiError;
use crate::notify::{DeliveryError, Notifier};
use crate::persistence::TrackingMarker;
use crate::types::{CommitInfo, RemoteItem, RepoId, Sha};

// ─── Generators ───

pub fn arb_identifier() -> impl Strategy<Value = String> {
    "v[0-9]{1,3}\\.[0-9]{1,3}(-[a-z]{1,5})?".prop_map(String::from)
}

/// Distinct identifiers, in arbitrary order.
pub fn arb_distinct_identifiers(len: Range<usize>) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set(arb_identifier(), len).prop_map(|set| set.into_iter().collect())
}

// ─── Builders ───

/// A fixed instant plus `hours`, so tests can reason about ordering.
pub fn hours_after_epoch(hours: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
}

/// A published release with an empty body.
pub fn release_at(name: &str, hours: i64) -> RemoteItem {
    RemoteItem::release(
        name,
        "",
        format!("https://github.com/octo/widgets/releases/tag/{name}"),
        Some(hours_after_epoch(hours)),
    )
}

/// A release with notes.
pub fn release_with_body(name: &str, hours: i64, body: &str) -> RemoteItem {
    let mut item = release_at(name, hours);
    item.body = body.to_string();
    item
}

/// A tag as it appears in a listing: no timestamp yet.
pub fn tag(name: &str, sha: &str) -> RemoteItem {
    RemoteItem::tag(
        name,
        Sha::from(sha),
        format!("https://github.com/octo/widgets/releases/tag/{name}"),
    )
}

pub fn commit_at(sha: &str, message: &str, hours: i64) -> CommitInfo {
    CommitInfo {
        sha: Sha::from(sha),
        message: message.to_string(),
        authored_at: Some(hours_after_epoch(hours)),
    }
}

/// A marker whose sentinel is `identifier`, published at `hours` and checked then.
pub fn marker_for(identifier: &str, hours: i64) -> TrackingMarker {
    TrackingMarker {
        last_identifier: Some(identifier.to_string()),
        last_timestamp: Some(hours_after_epoch(hours)),
        cache_token: None,
        last_checked_at: hours_after_epoch(hours),
    }
}

// ─── Scripted GitHub ───

#[derive(Debug, Clone, Copy)]
enum ListingFailure {
    RateLimited,
    Status(StatusCode),
    Undecodable,
}

#[derive(Debug, Default)]
struct FakeGitHubState {
    releases: Vec<RemoteItem>,
    release_etag: Option<String>,
    tags: Vec<RemoteItem>,
    tag_etag: Option<String>,
    listing_failure: Option<ListingFailure>,
    commits: HashMap<Sha, CommitInfo>,
    comparisons: HashMap<(String, String), Vec<CommitInfo>>,
    histories: HashMap<String, Vec<CommitInfo>>,
    failing_comparisons: HashSet<(String, String)>,
    broken_repos: HashSet<RepoId>,
    calls: Vec<(RepoId, GitHubEffect)>,
}

/// A scripted GitHub for one or more repositories.
///
/// Clones share state, so a test can keep a handle while the code under test
/// holds another. All repositories see the same scripted data; `calls` records
/// every effect in order.
#[derive(Debug, Clone, Default)]
pub struct FakeGitHub {
    state: Arc<Mutex<FakeGitHubState>>,
    repo: Option<RepoId>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeGitHubState> {
        self.state.lock().unwrap()
    }

    pub fn with_releases(self, releases: Vec<RemoteItem>, etag: Option<&str>) -> Self {
        self.set_releases(releases, etag);
        self
    }

    /// Replaces the release listing in place, e.g. between two runs.
    pub fn set_releases(&self, releases: Vec<RemoteItem>, etag: Option<&str>) {
        let mut state = self.state();
        state.releases = releases;
        state.release_etag = etag.map(String::from);
    }

    pub fn with_tags(self, tags: Vec<RemoteItem>, etag: Option<&str>) -> Self {
        {
            let mut state = self.state();
            state.tags = tags;
            state.tag_etag = etag.map(String::from);
        }
        self
    }

    pub fn with_commit(self, commit: CommitInfo) -> Self {
        self.add_commit(commit);
        self
    }

    /// Makes `commit` resolvable by SHA from now on.
    pub fn add_commit(&self, commit: CommitInfo) {
        self.state().commits.insert(commit.sha.clone(), commit);
    }

    /// Commits returned for `base...head`, oldest first.
    pub fn with_comparison(self, base: &str, head: &str, commits: Vec<CommitInfo>) -> Self {
        self.state()
            .comparisons
            .insert((base.to_string(), head.to_string()), commits);
        self
    }

    pub fn with_failing_comparison(self, base: &str, head: &str) -> Self {
        self.state()
            .failing_comparisons
            .insert((base.to_string(), head.to_string()));
        self
    }

    /// Commits reachable from `reference`, newest first.
    pub fn with_history(self, reference: &str, commits: Vec<CommitInfo>) -> Self {
        self.state().histories.insert(reference.to_string(), commits);
        self
    }

    pub fn rate_limited(self) -> Self {
        self.state().listing_failure = Some(ListingFailure::RateLimited);
        self
    }

    pub fn failing_listing(self, status: StatusCode) -> Self {
        self.state().listing_failure = Some(ListingFailure::Status(status));
        self
    }

    pub fn broken_listing(self) -> Self {
        self.state().listing_failure = Some(ListingFailure::Undecodable);
        self
    }

    /// Listings for `repo` come back undecodable; other repositories are unaffected.
    pub fn broken_for(self, repo: RepoId) -> Self {
        self.state().broken_repos.insert(repo);
        self
    }

    pub fn calls(&self) -> Vec<GitHubEffect> {
        self.state().calls.iter().map(|(_, e)| e.clone()).collect()
    }

    fn respond(&self, effect: &GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
        let mut state = self.state();
        let repo = self
            .repo
            .clone()
            .unwrap_or_else(|| RepoId::new("octo", "widgets"));
        let failure = if state.broken_repos.contains(&repo) {
            Some(ListingFailure::Undecodable)
        } else {
            state.listing_failure
        };
        state.calls.push((repo, effect.clone()));

        match effect {
            GitHubEffect::ListReleases { cache_token, .. } => {
                let (items, etag) = (state.releases.clone(), state.release_etag.clone());
                listing(failure, items, etag, cache_token.as_deref())
            }
            GitHubEffect::ListTags { cache_token, .. } => {
                let (items, etag) = (state.tags.clone(), state.tag_etag.clone());
                listing(failure, items, etag, cache_token.as_deref())
            }
            GitHubEffect::CompareCommits { base, head } => {
                let key = (base.clone(), head.clone());
                if state.failing_comparisons.contains(&key) {
                    return Err(GitHubApiError::unsuccessful_status(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "compare failed",
                    ));
                }
                state
                    .comparisons
                    .get(&key)
                    .cloned()
                    .map(GitHubResponse::Commits)
                    .ok_or_else(|| not_found(effect))
            }
            GitHubEffect::ListCommits { reference, .. } => state
                .histories
                .get(reference)
                .cloned()
                .map(GitHubResponse::Commits)
                .ok_or_else(|| not_found(effect)),
            GitHubEffect::GetCommit { sha } => state
                .commits
                .get(sha)
                .cloned()
                .map(GitHubResponse::Commit)
                .ok_or_else(|| not_found(effect)),
        }
    }
}

fn listing(
    failure: Option<ListingFailure>,
    items: Vec<RemoteItem>,
    etag: Option<String>,
    sent_token: Option<&str>,
) -> Result<GitHubResponse, GitHubApiError> {
    match failure {
        Some(ListingFailure::RateLimited) => Err(GitHubApiError::rate_limited(
            StatusCode::FORBIDDEN,
            Some(Utc::now() + Duration::minutes(10)),
        )),
        Some(ListingFailure::Status(status)) => {
            Err(GitHubApiError::unsuccessful_status(status, "scripted failure"))
        }
        Some(ListingFailure::Undecodable) => {
            Err(GitHubApiError::permanent_without_source("undecodable listing"))
        }
        None if etag.is_some() && etag.as_deref() == sent_token => {
            Ok(GitHubResponse::Listing(Listing::NotModified))
        }
        None => Ok(GitHubResponse::Listing(Listing::Fetched {
            items,
            cache_token: etag,
        })),
    }
}

fn not_found(effect: &GitHubEffect) -> GitHubApiError {
    GitHubApiError::unsuccessful_status(StatusCode::NOT_FOUND, format!("{effect:?}"))
}

impl GitHubInterpreter for FakeGitHub {
    type Error = GitHubApiError;

    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send {
        let response = self.respond(&effect);
        async move { response }
    }
}

impl GitHubConnector for FakeGitHub {
    type Interpreter = FakeGitHub;

    fn for_repo(&self, repo: &RepoId) -> FakeGitHub {
        FakeGitHub {
            state: Arc::clone(&self.state),
            repo: Some(repo.clone()),
        }
    }
}

// ─── Scripted categorizer ───

/// Answers every request the same way and counts calls.
#[derive(Debug, Clone)]
pub struct FakeCategorizer {
    answer: Option<Vec<CategoryGroup>>,
    calls: Arc<Mutex<usize>>,
}

impl FakeCategorizer {
    pub fn answering(groups: Vec<CategoryGroup>) -> Self {
        FakeCategorizer {
            answer: Some(groups),
            calls: Arc::default(),
        }
    }

    /// Fails every request, forcing the heuristic.
    pub fn failing() -> Self {
        FakeCategorizer {
            answer: None,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Categorizer for FakeCategorizer {
    fn categorize(
        &self,
        _body: &str,
    ) -> impl Future<Output = Result<Vec<CategoryGroup>, CategorizeError>> + Send {
        *self.calls.lock().unwrap() += 1;
        let answer = self.answer.clone();
        async move { answer.ok_or(CategorizeError::EmptyResponse) }
    }
}

// ─── Recording notifier ───

/// Records delivered payloads. Attempts whose (zero-based, cumulative) index
/// is in the failure set are rejected.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
    attempts: Arc<Mutex<usize>>,
    fail_on: Arc<Mutex<HashSet<usize>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(self, attempt: usize) -> Self {
        self.fail_on.lock().unwrap().insert(attempt);
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, payload: &str) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let current = *attempts;
            *attempts += 1;
            current
        };
        let result = if self.fail_on.lock().unwrap().contains(&attempt) {
            Err(DeliveryError::Rejected {
                status: reqwest::StatusCode::BAD_GATEWAY,
                description: format!("scripted failure on attempt {attempt}"),
            })
        } else {
            self.sent.lock().unwrap().push(payload.to_string());
            Ok(())
        };
        async move { result }
    }
}
