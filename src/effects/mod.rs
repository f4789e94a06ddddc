//! Effects-as-data for GitHub reads.
//!
//! Detection and commit-range resolution describe the API calls they need as
//! [`GitHubEffect`] values and receive [`GitHubResponse`] values back. This keeps
//! the reconciliation logic free of HTTP details and lets tests script the
//! upstream exactly.

pub mod github;
pub mod interpreter;

pub use github::{GitHubEffect, GitHubResponse, Listing};
pub use interpreter::{GitHubConnector, GitHubInterpreter};
