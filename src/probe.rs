//! Existence checks for indices, index patterns, and dashboards.
//!
//! Each probe performs exactly one read. A failed read is reported as absent:
//! callers treat absence as "needs creation" and rely on the later existence
//! checks of the reconcilers to avoid duplicates.

use tracing::warn;

use crate::api::SearchApi;
use crate::es_index;
use crate::types::Lookup;

pub async fn index_exists<A: SearchApi + ?Sized>(api: &A, index: &str) -> bool {
    match api.list_indices().await {
        Ok(listing) => es_index::index_listed(&listing, index),
        Err(err) => {
            warn!("probe: listing indices failed, treating {} as absent: {err:#}", index);
            false
        }
    }
}

pub async fn index_pattern_id<A: SearchApi + ?Sized>(
    api: &A,
    id: &str,
    title: &str,
) -> Option<String> {
    found_or_absent(api.get_index_pattern(id, title).await, "index pattern", title)
}

pub async fn dashboard_id<A: SearchApi + ?Sized>(api: &A, title: &str) -> Option<String> {
    found_or_absent(api.get_dashboard(title).await, "dashboard", title)
}

fn found_or_absent(lookup: Lookup, kind: &str, title: &str) -> Option<String> {
    match lookup {
        Lookup::Found(id) => Some(id),
        Lookup::Absent => None,
        Lookup::Failed(reason) => {
            warn!("probe: {} lookup for {} failed, treating as absent: {}", kind, title, reason);
            None
        }
    }
}
