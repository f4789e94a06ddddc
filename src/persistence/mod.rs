//! Persistence layer for the release relay.
//!
//! One [`TrackingMarker`] per subscription, stored behind the [`MarkerStore`]
//! trait. The run orchestrator is the only writer: it commits a marker after
//! the items up to it were delivered, so a crash or failed delivery means the
//! same items are detected again on the next run (at-least-once).

pub mod marker;
pub mod store;

pub use marker::TrackingMarker;
pub use store::{
    JsonFileStore, MarkerMap, MarkerStore, MemoryStore, PersistedState, SCHEMA_VERSION,
    StoreError,
};
