//! Release Relay - watches GitHub releases and tags and relays categorized
//! change notes to a Telegram chat.
//!
//! This library provides change detection, commit-range resolution,
//! categorization, notification assembly and the run orchestrator. The binary
//! in `main.rs` wires them to live HTTP clients.

pub mod categorize;
pub mod commits;
pub mod config;
pub mod detect;
pub mod effects;
pub mod github;
pub mod notify;
pub mod persistence;
pub mod types;
pub mod worker;

#[cfg(test)]
pub mod test_utils;
