//! Commit-range resolution for tag subscriptions.

pub mod resolver;

pub use resolver::{MAX_TAG_COMMITS, resolve_tag_bodies, synthesize_body};
