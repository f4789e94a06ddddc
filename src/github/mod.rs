//! GitHub API client and effect interpreter.
//!
//! This module executes `GitHubEffect`s via the octocrab library, implementing
//! the `GitHubInterpreter` trait defined in the effects module.
//!
//! Key features:
//! - Conditional listing fetches with ETags
//! - Distinguishes rate limiting, transient failures and unusable responses
//! - Repo-scoped clients created per subscription from one shared instance

mod client;
mod error;
mod interpreter;
mod wire;

pub use client::{DEFAULT_API_URL, OctocrabClient, RawResponse, build_octocrab};
pub use error::{GitHubApiError, GitHubErrorKind, classify_failure, rate_limit_reset};
pub use interpreter::interpret_github_effect;
