//! GitHub API error types.
//!
//! Errors are categorized by how the relay reacts to them:
//!
//! - **Rate limited**: the subscription is skipped for this cycle and the wait
//!   until the limit resets is logged.
//! - **Transient**: any other non-2xx status or a network failure. Skipped for
//!   this cycle; there is no retry within a run.
//! - **Permanent**: the response could not be understood (undecodable JSON,
//!   an unexpected response shape). These escape to the run orchestrator and
//!   count as a failed subscription.

use std::fmt;

use chrono::{DateTime, Utc};
use http::{HeaderMap, StatusCode};
use thiserror::Error;

/// The kind of GitHub API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// HTTP 429, or HTTP 403 carrying rate-limit signals.
    RateLimited,

    /// Other non-2xx statuses and network-level failures.
    Transient,

    /// The request completed but the result is unusable.
    Permanent,
}

impl GitHubErrorKind {
    /// Returns true if the condition should clear up by the next poll.
    pub fn is_transient(&self) -> bool {
        matches!(self, GitHubErrorKind::RateLimited | GitHubErrorKind::Transient)
    }
}

/// A GitHub API error with categorization.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if a response was received.
    pub status_code: Option<u16>,

    /// A human-readable description of the error.
    pub message: String,

    /// When the rate limit resets, if the response said so.
    pub rate_limit_reset: Option<DateTime<Utc>>,

    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    /// Creates a rate-limit error.
    pub fn rate_limited(status: StatusCode, reset: Option<DateTime<Utc>>) -> Self {
        Self {
            kind: GitHubErrorKind::RateLimited,
            status_code: Some(status.as_u16()),
            message: "rate limit exceeded".to_string(),
            rate_limit_reset: reset,
            source: None,
        }
    }

    /// Creates a transient error for an unsuccessful HTTP status.
    pub fn unsuccessful_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Transient,
            status_code: Some(status.as_u16()),
            message: message.into(),
            rate_limit_reset: None,
            source: None,
        }
    }

    /// Creates a permanent error without a source.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            rate_limit_reset: None,
            source: None,
        }
    }

    /// A response body that did not match the expected shape.
    pub fn decode(what: &str, source: serde_json::Error) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: format!("could not decode {what}: {source}"),
            rate_limit_reset: None,
            source: Some(Box::new(source)),
        }
    }

    /// The interpreter answered an effect with the wrong response variant.
    pub fn unexpected_response(effect: &str) -> Self {
        Self::permanent_without_source(format!("unexpected response to {effect}"))
    }

    /// Categorizes an octocrab error.
    ///
    /// Octocrab only fails raw requests before a response exists (connection,
    /// TLS, URI and body-streaming problems), so most errors are transient.
    /// Serialization failures mean the payload itself is wrong.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let kind = match &err {
            octocrab::Error::Serde { .. } | octocrab::Error::Json { .. } => {
                GitHubErrorKind::Permanent
            }
            _ => GitHubErrorKind::Transient,
        };
        Self {
            kind,
            status_code: None,
            message: err.to_string(),
            rate_limit_reset: None,
            source: Some(Box::new(err)),
        }
    }

    /// Seconds until the rate limit resets, if known and in the future.
    pub fn rate_limit_wait(&self, now: DateTime<Utc>) -> Option<i64> {
        self.rate_limit_reset
            .map(|reset| (reset - now).num_seconds())
            .filter(|secs| *secs > 0)
    }
}

/// Turns a non-2xx, non-304 response into an error.
///
/// GitHub signals primary rate limits with 403 plus `x-ratelimit-remaining: 0`,
/// and secondary limits with 403 or 429 and a `retry-after` header or a
/// "rate limit" message.
pub fn classify_failure(status: StatusCode, headers: &HeaderMap, body: &str) -> GitHubApiError {
    let now = Utc::now();
    let exhausted = header_str(headers, "x-ratelimit-remaining") == Some("0");
    let is_rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (exhausted
                || headers.contains_key("retry-after")
                || is_rate_limit_message(body)));

    if is_rate_limited {
        return GitHubApiError::rate_limited(status, rate_limit_reset(headers, now));
    }

    GitHubApiError::unsuccessful_status(status, summarize_body(body))
}

/// Reads the reset time from `x-ratelimit-reset` (epoch seconds) or
/// `retry-after` (seconds from now).
pub fn rate_limit_reset(headers: &HeaderMap, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(reset) = header_str(headers, "x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
    {
        return Some(reset);
    }

    header_str(headers, "retry-after")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|secs| now + chrono::Duration::seconds(secs))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_message(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}

/// Pulls `message` out of a GitHub error body, or a bounded prefix of the raw text.
fn summarize_body(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) => body.chars().take(200).collect(),
    }
}
