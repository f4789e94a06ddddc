//! Octocrab client wrapper scoped to a specific repository.
//!
//! `OctocrabClient` wraps an `Octocrab` instance and scopes all operations to a
//! specific repository, matching the design where effects are repo-scoped (the
//! `GitHubEffect` enum doesn't include repo info).
//!
//! Requests go through octocrab's raw `_get_with_headers` so the relay sees the
//! status and headers itself: conditional fetches need `304 Not Modified` and
//! the `ETag`, and rate limiting needs the `x-ratelimit-*` headers.

use http::header::{ACCEPT, ETAG, HeaderMap, HeaderValue, IF_NONE_MATCH};
use http::StatusCode;
use octocrab::Octocrab;

use super::error::GitHubApiError;
use crate::effects::GitHubConnector;
use crate::types::RepoId;

/// Default REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

/// Builds the shared octocrab instance.
///
/// Without a token requests are unauthenticated (60 requests per hour).
pub fn build_octocrab(token: Option<&str>, api_url: &str) -> Result<Octocrab, octocrab::Error> {
    let mut builder = Octocrab::builder().base_uri(api_url)?;
    if let Some(token) = token {
        builder = builder.personal_token(token.to_string());
    }
    builder.build()
}

/// A GitHub API client scoped to a specific repository.
#[derive(Clone)]
pub struct OctocrabClient {
    /// The underlying octocrab client.
    client: Octocrab,

    /// The repository this client is scoped to.
    repo: RepoId,
}

/// Status, headers and body of a completed request.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    /// The response's `ETag`, if any.
    pub fn etag(&self) -> Option<String> {
        self.headers
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

impl OctocrabClient {
    /// Creates a new client scoped to the given repository.
    pub fn new(client: Octocrab, repo: RepoId) -> Self {
        Self { client, repo }
    }

    /// Returns the repository this client is scoped to.
    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    /// Route prefix for this repository, e.g. `/repos/owner/name`.
    pub fn repo_route(&self) -> String {
        format!(
            "/repos/{}/{}",
            urlencoding::encode(&self.repo.owner),
            urlencoding::encode(&self.repo.repo)
        )
    }

    /// Issues a GET, optionally conditional on `cache_token`.
    ///
    /// Any HTTP status is returned as-is; only failures to complete the
    /// request become errors.
    pub async fn get_raw(
        &self,
        route: &str,
        cache_token: Option<&str>,
    ) -> Result<RawResponse, GitHubApiError> {
        let headers = request_headers(cache_token)?;
        let response = self
            .client
            ._get_with_headers(route, Some(headers))
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = self
            .client
            .body_to_string(response)
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn request_headers(cache_token: Option<&str>) -> Result<HeaderMap, GitHubApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github+json"),
    );
    headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
    if let Some(token) = cache_token {
        let value = HeaderValue::from_str(token).map_err(|_| {
            GitHubApiError::permanent_without_source(format!(
                "cache token {token:?} is not a valid header value"
            ))
        })?;
        headers.insert(IF_NONE_MATCH, value);
    }
    Ok(headers)
}

impl GitHubConnector for Octocrab {
    type Interpreter = OctocrabClient;

    fn for_repo(&self, repo: &RepoId) -> OctocrabClient {
        OctocrabClient::new(self.clone(), repo.clone())
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient")
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}
