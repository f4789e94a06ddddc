//! Incremental change detection.
//!
//! [`reconcile`] holds the pure sentinel algorithm; [`detector`] wraps it with
//! the conditional upstream fetch and the handling of transient failures.

pub mod detector;
pub mod reconcile;

pub use detector::{LISTING_PAGE_SIZE, PollOutcome, ReconciliationResult, detect_changes};
pub use reconcile::{Scan, Tracked, apply_cutoff, scan};
