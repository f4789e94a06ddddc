//! Subscriptions: which repository to watch, and how.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{RepoId, StateKey};

/// What kind of upstream listing a subscription follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchMode {
    /// Published GitHub releases. Release notes come from the release body.
    #[default]
    Release,

    /// Bare git tags. Notes are synthesized from the commits between tags.
    Tag,
}

impl WatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchMode::Release => "release",
            WatchMode::Tag => "tag",
        }
    }
}

impl fmt::Display for WatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A watched repository. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub repo: RepoId,
    pub mode: WatchMode,
}

impl Subscription {
    pub fn new(repo: RepoId, mode: WatchMode) -> Self {
        Subscription { repo, mode }
    }

    pub fn release(repo: RepoId) -> Self {
        Self::new(repo, WatchMode::Release)
    }

    pub fn tag(repo: RepoId) -> Self {
        Self::new(repo, WatchMode::Tag)
    }

    /// The key this subscription's marker is persisted under.
    pub fn state_key(&self) -> StateKey {
        match self.mode {
            WatchMode::Release => StateKey::new(self.repo.to_string()),
            mode => StateKey::new(format!("{}:{}", self.repo, mode)),
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.repo, self.mode)
    }
}
