//! Seams between the detection logic and the GitHub API.
//!
//! Detection and commit resolution only ever build [`GitHubEffect`] values;
//! a [`GitHubConnector`] hands out one interpreter per repository, and the
//! interpreter turns each effect into a [`GitHubResponse`]. Tests swap in a
//! scripted connector that records every effect it is asked to run.

use std::future::Future;

use super::github::{GitHubEffect, GitHubResponse};
use crate::types::RepoId;

/// Interprets GitHub effects against the GitHub API.
///
/// Implementations are constructed with a `RepoId`, so all effects executed
/// through a single interpreter instance are scoped to that repository.
pub trait GitHubInterpreter {
    /// The error type returned by this interpreter.
    type Error;

    /// Execute a GitHub effect and return its response.
    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send;
}

/// Produces repo-scoped interpreters from one shared connection.
pub trait GitHubConnector {
    type Interpreter: GitHubInterpreter;

    fn for_repo(&self, repo: &RepoId) -> Self::Interpreter;
}
