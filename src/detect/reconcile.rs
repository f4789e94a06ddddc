//! Sentinel reconciliation.
//!
//! Given an upstream listing (newest first) and the last identifier the relay
//! notified about, decide which items are new. The same algorithm serves both
//! releases and tags; it only needs an identifier and, for the fallback path, a
//! timestamp from each item.

use chrono::{DateTime, Utc};

use crate::types::RemoteItem;

/// Something that can be matched against a stored sentinel.
pub trait Tracked {
    fn identifier(&self) -> &str;

    /// `None` when the time is not known (e.g. an unresolved tag).
    fn timestamp(&self) -> Option<DateTime<Utc>>;
}

impl Tracked for RemoteItem {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
}

/// Outcome of scanning a listing for the sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan<T> {
    /// No sentinel was stored. Holds at most the single newest item, so a
    /// first run records a baseline instead of replaying the whole page.
    Seeded(Vec<T>),

    /// The sentinel was found. Holds everything newer than it, newest first.
    SentinelFound(Vec<T>),

    /// The sentinel is not in the listing (deleted, renamed, or aged out of
    /// the page). Holds every scanned item; the caller must narrow them with
    /// [`apply_cutoff`].
    SentinelMissing(Vec<T>),
}

/// Scans `items` (newest first) for `sentinel`.
pub fn scan<T: Tracked>(items: Vec<T>, sentinel: Option<&str>) -> Scan<T> {
    let Some(sentinel) = sentinel else {
        return Scan::Seeded(items.into_iter().take(1).collect());
    };

    let mut newer = Vec::new();
    for item in items {
        if item.identifier() == sentinel {
            return Scan::SentinelFound(newer);
        }
        newer.push(item);
    }
    Scan::SentinelMissing(newer)
}

/// Keeps only candidates timestamped strictly after `cutoff`, preserving order.
///
/// Candidates without a timestamp cannot be placed in time and are dropped.
pub fn apply_cutoff<T: Tracked>(candidates: Vec<T>, cutoff: DateTime<Utc>) -> Vec<T> {
    candidates
        .into_iter()
        .filter(|item| item.timestamp().is_some_and(|ts| ts > cutoff))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{arb_distinct_identifiers, hours_after_epoch, release_at};
    use proptest::prelude::*;

    fn ids(items: &[RemoteItem]) -> Vec<&str> {
        items.iter().map(|i| i.identifier.as_str()).collect()
    }

    fn listing() -> Vec<RemoteItem> {
        (1..=5)
            .rev()
            .map(|n| release_at(&format!("T{n}"), n))
            .collect()
    }

    #[test]
    fn first_run_yields_only_newest() {
        let scan = scan(listing(), None);
        assert_eq!(scan, Scan::Seeded(vec![release_at("T5", 5)]));
    }

    #[test]
    fn first_run_on_empty_listing_yields_nothing() {
        assert_eq!(scan(Vec::<RemoteItem>::new(), None), Scan::Seeded(vec![]));
    }

    #[test]
    fn sentinel_match_yields_newer_items_in_order() {
        let Scan::SentinelFound(new) = scan(listing(), Some("T3")) else {
            panic!("sentinel should be found");
        };
        assert_eq!(ids(&new), ["T5", "T4"]);
    }

    #[test]
    fn sentinel_at_head_yields_nothing() {
        assert_eq!(scan(listing(), Some("T5")), Scan::SentinelFound(vec![]));
    }

    fn after_cutoff(upstream: Vec<RemoteItem>, sentinel: &str, hours: i64) -> Vec<RemoteItem> {
        let Scan::SentinelMissing(candidates) = scan(upstream, Some(sentinel)) else {
            panic!("sentinel should be missing");
        };
        apply_cutoff(candidates, hours_after_epoch(hours))
    }

    #[test]
    fn missing_sentinel_keeps_items_after_cutoff() {
        let upstream = vec![release_at("T5", 5), release_at("T4", 4)];

        let new = after_cutoff(upstream, "T3", 3);

        assert_eq!(ids(&new), ["T5", "T4"]);
    }

    #[test]
    fn missing_sentinel_drops_items_before_cutoff() {
        let upstream = vec![release_at("T5", 5), release_at("T4", 2)];

        let new = after_cutoff(upstream, "T3", 3);

        assert_eq!(ids(&new), ["T5"]);
    }

    #[test]
    fn cutoff_is_strict() {
        let upstream = vec![release_at("T4", 3)];
        assert!(after_cutoff(upstream, "T3", 3).is_empty());
    }

    #[test]
    fn cutoff_drops_items_without_timestamp() {
        let mut undated = release_at("T4", 9);
        undated.published_at = None;

        assert!(apply_cutoff(vec![undated], hours_after_epoch(0)).is_empty());
    }

    proptest! {
        #[test]
        fn sentinel_match_yields_exact_prefix(
            (names, index) in arb_distinct_identifiers(1..20)
                .prop_flat_map(|names| { let len = names.len(); (Just(names), 0..len) })
        ) {
            let items: Vec<RemoteItem> = names
                .iter()
                .enumerate()
                .map(|(i, name)| release_at(name, (names.len() - i) as i64))
                .collect();
            let sentinel = names[index].clone();

            let Scan::SentinelFound(new) = scan(items.clone(), Some(&sentinel)) else {
                panic!("sentinel present in listing");
            };

            prop_assert_eq!(new, items[..index].to_vec());
        }

        #[test]
        fn seeding_never_yields_more_than_one(names in arb_distinct_identifiers(0..30)) {
            let items: Vec<RemoteItem> = names.iter().map(|n| release_at(n, 1)).collect();
            let Scan::Seeded(seeded) = scan(items.clone(), None) else {
                panic!("no sentinel means seeding");
            };
            prop_assert!(seeded.len() <= 1);
            prop_assert_eq!(seeded.first(), items.first());
        }

        #[test]
        fn cutoff_result_is_ordered_subset(
            hours in prop::collection::vec(0i64..48, 0..20),
            cutoff in 0i64..48,
        ) {
            let items: Vec<RemoteItem> = hours
                .iter()
                .enumerate()
                .map(|(i, h)| release_at(&format!("r{i}"), *h))
                .collect();

            let kept = apply_cutoff(items.clone(), hours_after_epoch(cutoff));

            let expected: Vec<RemoteItem> = items
                .into_iter()
                .filter(|i| i.published_at.unwrap() > hours_after_epoch(cutoff))
                .collect();
            prop_assert_eq!(kept, expected);
        }
    }
}
