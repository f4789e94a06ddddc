//! Categorization of release notes.
//!
//! A [`Categorizer`] (normally the language model) is asked first. Its answer is
//! validated, and the keyword heuristic in [`fallback`] takes over whenever the
//! model fails or returns nothing usable. Categorization never fails a run.

pub mod category;
pub mod fallback;
pub mod llm;
pub mod prompt;

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::types::{DisplayZone, RemoteItem};

pub use category::{Category, CategorizedItem, CategoryGroup};
pub use fallback::{fallback_categories, infer_category};
pub use llm::{
    CategorizeError, Categorizer, LlmCategorizer, LlmSettings, Provider, UnknownProvider,
};

/// Display format for item timestamps.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders `ts` in the configured zone.
pub fn format_timestamp(ts: DateTime<Utc>, zone: DisplayZone) -> String {
    zone.format(ts, DATE_FORMAT)
}

/// Drops blank items, then groups left without items.
pub fn validate_groups(groups: Vec<CategoryGroup>) -> Vec<CategoryGroup> {
    groups
        .into_iter()
        .map(|group| CategoryGroup {
            category: group.category,
            items: group
                .items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        })
        .filter(|group| !group.items.is_empty())
        .collect()
}

/// Categorizes one item for rendering.
///
/// Items with an empty body get no categories and never reach the model.
pub async fn categorize_item<C: Categorizer>(
    categorizer: &C,
    item: &RemoteItem,
    zone: DisplayZone,
) -> CategorizedItem {
    let mut categorized = CategorizedItem {
        identifier: item.identifier.clone(),
        date: item
            .published_at
            .map(|ts| format_timestamp(ts, zone))
            .unwrap_or_default(),
        url: item.url.clone(),
        categories: Vec::new(),
    };

    if item.body.trim().is_empty() {
        return categorized;
    }

    let started = Instant::now();
    categorized.categories = match categorizer.categorize(&item.body).await {
        Ok(groups) => {
            let groups = validate_groups(groups);
            if groups.is_empty() {
                warn!(item = %item.identifier, "Model returned no categories, using heuristic");
                fallback_categories(&item.body)
            } else {
                info!(
                    item = %item.identifier,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    groups = groups.len(),
                    "Categorized"
                );
                groups
            }
        }
        Err(e) => {
            warn!(
                item = %item.identifier,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "Categorization failed, using heuristic"
            );
            fallback_categories(&item.body)
        }
    };
    categorized
}
