//! Merge & dedup of freshly fetched pages.
//!
//! Entries already held locally always win over fetched copies. A local entry
//! may carry an optimistic change the server has not confirmed yet, and a
//! slightly stale page must not clobber it.

use harvest_model::Reconcilable;
use harvest_types::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Where newly seen entities go relative to the existing collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Feed refresh: new entities lead, newest first.
    PrependNew,
    /// Pagination: new entities trail, older at the tail.
    AppendNew,
}

/// Combines `incoming` with `existing` without ever duplicating an id.
///
/// Incoming entities whose id is already present (in `existing`, or earlier in
/// `incoming`) are dropped. An empty `incoming` returns `existing` unchanged.
pub fn merge_page<E: Reconcilable>(existing: &[E], incoming: Vec<E>, policy: MergePolicy) -> Vec<E> {
    let fresh = fresh_entities(existing, incoming);
    if fresh.is_empty() {
        return existing.to_vec();
    }

    let mut merged = Vec::with_capacity(existing.len() + fresh.len());
    match policy {
        MergePolicy::PrependNew => {
            merged.extend(fresh);
            merged.extend_from_slice(existing);
        }
        MergePolicy::AppendNew => {
            merged.extend_from_slice(existing);
            merged.extend(fresh);
        }
    }
    merged
}

/// The entities of `incoming` not yet present, in their original order.
pub(crate) fn fresh_entities<E: Reconcilable>(existing: &[E], incoming: Vec<E>) -> Vec<E> {
    let mut seen: HashSet<EntityId> = existing.iter().map(|e| e.id().clone()).collect();
    let offered = incoming.len();
    let fresh: Vec<E> = incoming
        .into_iter()
        .filter(|e| seen.insert(e.id().clone()))
        .collect();

    if fresh.len() < offered {
        debug!(
            "Merge kept {} of {} incoming entities ({} already held)",
            fresh.len(),
            offered,
            offered - fresh.len()
        );
    }
    fresh
}

/// Removes later duplicates from `items`, keeping first occurrences.
pub(crate) fn dedup_by_id<E: Reconcilable>(items: Vec<E>) -> Vec<E> {
    fresh_entities(&[], items)
}
