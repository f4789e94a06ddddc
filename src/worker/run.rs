//! One pass over all subscriptions.
//!
//! Markers are loaded once, each subscription is processed in turn, and the
//! markers are saved once at the end. A subscription's marker only moves after
//! every payload for it was delivered, so a failed delivery is retried (and
//! possibly partly duplicated) on the next run rather than lost.

use std::time::Instant;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::categorize::{Categorizer, categorize_item};
use crate::commits::resolve_tag_bodies;
use crate::detect::{PollOutcome, ReconciliationResult, detect_changes};
use crate::effects::{GitHubConnector, GitHubInterpreter};
use crate::github::GitHubApiError;
use crate::notify::{Notifier, split_messages};
use crate::persistence::{MarkerStore, StoreError, TrackingMarker};
use crate::types::{DisplayZone, RemoteItem, Subscription, WatchMode};

/// An unexpected failure while processing one subscription.
///
/// Transient upstream conditions and delivery failures are not errors; they
/// leave the marker untouched and are retried next run.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    GitHub(#[from] GitHubApiError),
}

/// What processing a subscription decided about its marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    /// Nothing to write.
    Unchanged,

    /// Write this marker. `delivered` counts the items notified.
    Commit {
        marker: TrackingMarker,
        delivered: usize,
    },

    /// A payload was rejected; the marker stays where it was.
    DeliveryFailed,
}

/// Presentation settings for a run.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub target_lang: String,
    pub timezone: DisplayZone,
    /// Deliver the baseline item recorded on a subscription's first poll.
    pub notify_on_first_run: bool,
}

/// Summary of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub processed: usize,
    pub items_delivered: usize,
    pub delivery_failures: usize,
    pub failures: usize,
    /// The pass stopped early because shutdown was requested.
    pub cancelled: bool,
}

impl RunReport {
    /// Process exit code: non-zero when any subscription hit an unexpected error.
    pub fn exit_code(&self) -> i32 {
        if self.failures > 0 { 1 } else { 0 }
    }
}

/// Wires the collaborators of a run together.
#[derive(Debug)]
pub struct Relay<C, Z, N, S> {
    connector: C,
    categorizer: Z,
    notifier: N,
    store: S,
    settings: RelaySettings,
}

impl<C, Z, N, S> Relay<C, Z, N, S>
where
    C: GitHubConnector,
    C::Interpreter: GitHubInterpreter<Error = GitHubApiError>,
    Z: Categorizer,
    N: Notifier,
    S: MarkerStore,
{
    pub fn new(connector: C, categorizer: Z, notifier: N, store: S, settings: RelaySettings) -> Self {
        Relay {
            connector,
            categorizer,
            notifier,
            store,
            settings,
        }
    }

    /// Processes every subscription once.
    ///
    /// Only state-store failures abort the pass. Cancellation is checked between
    /// subscriptions; markers committed before it are still saved.
    pub async fn run_once(
        &self,
        subscriptions: &[Subscription],
        cancel: &CancellationToken,
    ) -> Result<RunReport, StoreError> {
        let started = Instant::now();
        let mut markers = self.store.load()?;
        let mut report = RunReport::default();

        info!(subscriptions = subscriptions.len(), "Starting run");

        for subscription in subscriptions {
            if cancel.is_cancelled() {
                info!("Shutdown requested, stopping run early");
                report.cancelled = true;
                break;
            }

            let key = subscription.state_key();
            report.processed += 1;
            match self
                .process_subscription(subscription, markers.get(&key))
                .await
            {
                Ok(SubscriptionOutcome::Unchanged) => {}
                Ok(SubscriptionOutcome::Commit { marker, delivered }) => {
                    report.items_delivered += delivered;
                    markers.insert(key, marker);
                }
                Ok(SubscriptionOutcome::DeliveryFailed) => report.delivery_failures += 1,
                Err(e) => {
                    error!(subscription = %subscription, error = %e, "Subscription failed");
                    report.failures += 1;
                }
            }
        }

        self.store.save(&markers)?;

        info!(
            duration_ms = started.elapsed().as_millis() as u64,
            processed = report.processed,
            delivered = report.items_delivered,
            delivery_failures = report.delivery_failures,
            failures = report.failures,
            "Run complete"
        );
        Ok(report)
    }

    /// Detects, resolves, categorizes and delivers for one subscription, and
    /// proposes the marker to store.
    #[instrument(skip(self, marker), fields(key = %subscription.state_key()))]
    pub async fn process_subscription(
        &self,
        subscription: &Subscription,
        marker: Option<&TrackingMarker>,
    ) -> Result<SubscriptionOutcome, SubscriptionError> {
        let now = Utc::now();
        let github = self.connector.for_repo(&subscription.repo);
        let result = detect_changes(&github, subscription, marker).await?;

        if result.new_items.is_empty() {
            return Ok(idle_outcome(subscription, marker, result, now));
        }

        let sentinel = marker.and_then(|m| m.last_identifier.as_deref());
        let is_seed = sentinel.is_none();
        let cache_token = result.cache_token;

        let items: Vec<RemoteItem> = match subscription.mode {
            WatchMode::Release => result.new_items.into_iter().rev().collect(),
            WatchMode::Tag => {
                resolve_tag_bodies(&github, subscription, result.new_items, sentinel, now).await?
            }
        };
        let Some(newest) = items.last() else {
            return Ok(SubscriptionOutcome::Unchanged);
        };

        if is_seed && !self.settings.notify_on_first_run {
            info!(baseline = %newest.identifier, "Recorded baseline without notifying");
            return Ok(SubscriptionOutcome::Commit {
                marker: TrackingMarker::advanced_to(marker, newest, cache_token, now),
                delivered: 0,
            });
        }

        info!(
            count = items.len(),
            newest = %newest.identifier,
            "New items found"
        );

        let mut categorized = Vec::with_capacity(items.len());
        for item in &items {
            categorized.push(categorize_item(&self.categorizer, item, self.settings.timezone).await);
        }

        let payloads = split_messages(
            &subscription.repo.to_string(),
            &categorized,
            &self.settings.target_lang,
        );
        for (index, payload) in payloads.iter().enumerate() {
            if let Err(e) = self.notifier.send(payload).await {
                error!(
                    payload = index + 1,
                    of = payloads.len(),
                    error = %e,
                    "Delivery failed, marker left unchanged"
                );
                return Ok(SubscriptionOutcome::DeliveryFailed);
            }
        }

        info!(latest = %newest.identifier, payloads = payloads.len(), "Notified");
        Ok(SubscriptionOutcome::Commit {
            marker: TrackingMarker::advanced_to(marker, newest, cache_token, now),
            delivered: items.len(),
        })
    }
}

/// The marker update for a poll that produced nothing to deliver.
fn idle_outcome(
    subscription: &Subscription,
    marker: Option<&TrackingMarker>,
    result: ReconciliationResult,
    now: DateTime<Utc>,
) -> SubscriptionOutcome {
    if result.outcome != PollOutcome::Fetched {
        debug!(outcome = ?result.outcome, "Nothing fetched");
        return SubscriptionOutcome::Unchanged;
    }

    let marker = match (marker, result.rebaseline) {
        (Some(previous), Some(item)) => previous.rebaselined_to(&item, result.cache_token, now),
        (None, Some(item)) => TrackingMarker::advanced_to(None, &item, result.cache_token, now),
        (None, None) => {
            info!(repo = %subscription.repo, mode = %subscription.mode, "Listing is empty, recording check");
            TrackingMarker {
                cache_token: result.cache_token,
                ..TrackingMarker::empty(now)
            }
        }
        (Some(previous), None) if previous.cache_token != result.cache_token => {
            debug!("Listing changed without new items, refreshing cache token");
            previous.refreshed(result.cache_token, now)
        }
        (Some(_), None) => {
            debug!("No new items");
            return SubscriptionOutcome::Unchanged;
        }
    };
    SubscriptionOutcome::Commit {
        marker,
        delivered: 0,
    }
}
