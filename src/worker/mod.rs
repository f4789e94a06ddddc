//! Run orchestration.
//!
//! # Module Structure
//!
//! - [`run`]: a single pass over all subscriptions, with marker commits gated
//!   on delivery
//! - [`poll`]: the daemon loop that repeats passes on an interval

mod poll;
mod run;


pub use poll::{PollConfig, run_forever};
pub use run::{
    Relay, RelaySettings, RunReport, SubscriptionError, SubscriptionOutcome,
};
