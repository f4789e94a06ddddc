//! Core domain types for the release relay.
//!
//! This module contains the fundamental types shared by detection, persistence
//! and notification.

pub mod ids;
pub mod item;
pub mod subscription;
pub mod zone;

// Re-export commonly used types at the module level
pub use ids::{InvalidRepoId, RepoId, Sha, StateKey};
pub use item::{CommitInfo, RemoteItem};
pub use subscription::{Subscription, WatchMode};
pub use zone::DisplayZone;
