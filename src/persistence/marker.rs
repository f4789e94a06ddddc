//! Per-subscription tracking markers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::RemoteItem;

/// What the relay remembers about one subscription between runs.
///
/// `last_identifier` only moves forward once the items up to it were delivered
/// (or recorded as the first-run baseline). `cache_token` may be refreshed on its
/// own when the upstream listing changed without producing anything new.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingMarker {
    /// Tag name of the most recently notified item. `None` until the first
    /// non-empty listing is seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_identifier: Option<String>,

    /// Publish (or commit) time of `last_identifier`. Only used as a cutoff
    /// when the identifier disappears from the upstream listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<DateTime<Utc>>,

    /// ETag of the last successful listing fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_token: Option<String>,

    /// When this marker was last written after a successful poll.
    pub last_checked_at: DateTime<Utc>,
}

impl TrackingMarker {
    /// A marker with nothing recorded yet.
    pub fn empty(checked_at: DateTime<Utc>) -> Self {
        TrackingMarker {
            last_identifier: None,
            last_timestamp: None,
            cache_token: None,
            last_checked_at: checked_at,
        }
    }

    /// The point in time after which items count as new when the sentinel
    /// is missing: the last item's timestamp, else the last check.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.last_timestamp.unwrap_or(self.last_checked_at)
    }

    /// The marker after `item` (the newest delivered item) has been notified.
    ///
    /// The previous timestamp is kept when the item has none.
    pub fn advanced_to(
        previous: Option<&TrackingMarker>,
        item: &RemoteItem,
        cache_token: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        TrackingMarker {
            last_identifier: Some(item.identifier.clone()),
            last_timestamp: item
                .published_at
                .or_else(|| previous.and_then(|m| m.last_timestamp)),
            cache_token,
            last_checked_at: now,
        }
    }

    /// Moves the sentinel to `item` without notifying anything.
    ///
    /// Used when the old sentinel vanished and nothing in the listing is newer
    /// than the cutoff. The timestamp never moves backwards.
    pub fn rebaselined_to(
        &self,
        item: &RemoteItem,
        cache_token: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let last_timestamp = match (self.last_timestamp, item.published_at) {
            (Some(old), Some(new)) => Some(old.max(new)),
            (old, new) => old.or(new),
        };
        TrackingMarker {
            last_identifier: Some(item.identifier.clone()),
            last_timestamp,
            cache_token,
            last_checked_at: now,
        }
    }

    /// The same marker with a refreshed cache token and check time.
    pub fn refreshed(&self, cache_token: Option<String>, now: DateTime<Utc>) -> Self {
        TrackingMarker {
            cache_token,
            last_checked_at: now,
            ..self.clone()
        }
    }
}
