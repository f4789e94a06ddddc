//! Daemon scheduling.
//!
//! The first pass starts immediately; later passes start `poll_interval` after
//! the previous one finished. The subscription list is re-read before every
//! pass so edits take effect without a restart.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::run::Relay;
use crate::categorize::Categorizer;
use crate::config::ConfigError;
use crate::effects::{GitHubConnector, GitHubInterpreter};
use crate::github::GitHubApiError;
use crate::notify::Notifier;
use crate::persistence::{MarkerStore, StoreError};
use crate::types::Subscription;

/// Default pause between passes (15 minutes).
const DEFAULT_POLL_INTERVAL_SECS: u64 = 900;

#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Pause between the end of one pass and the start of the next.
    pub poll_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl PollConfig {
    pub fn new(poll_interval: Duration) -> Self {
        PollConfig { poll_interval }
    }
}

/// Runs passes until `shutdown` is cancelled. Returns the number of passes run.
///
/// A subscription list that fails to load skips that pass. State-store
/// failures are returned, since continuing could re-deliver everything.
pub async fn run_forever<C, Z, N, S, L>(
    relay: &Relay<C, Z, N, S>,
    load_subscriptions: L,
    config: &PollConfig,
    shutdown: CancellationToken,
) -> Result<usize, StoreError>
where
    C: GitHubConnector,
    C::Interpreter: GitHubInterpreter<Error = GitHubApiError>,
    Z: Categorizer,
    N: Notifier,
    S: MarkerStore,
    L: Fn() -> Result<Vec<Subscription>, ConfigError>,
{
    info!(
        interval_secs = config.poll_interval.as_secs(),
        "Polling started"
    );
    let mut passes = 0;

    while !shutdown.is_cancelled() {
        match load_subscriptions() {
            Ok(subscriptions) => {
                relay.run_once(&subscriptions, &shutdown).await?;
                passes += 1;
            }
            Err(e) => error!(error = %e, "Could not load subscriptions, skipping this pass"),
        }

        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }

    info!(passes, "Polling stopped");
    Ok(passes)
}
