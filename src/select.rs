// src/select.rs
//! Selector / ranker. Pure: same input, same Selection, whatever order the
//! scores arrived in.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::types::{Budget, ScoredEntry, Selection};

/// Score desc, then newest first, then identity asc.
pub fn rank_order(a: &ScoredEntry, b: &ScoredEntry) -> Ordering {
    b.relevance_score
        .total_cmp(&a.relevance_score)
        .then_with(|| b.entry.published_at.cmp(&a.entry.published_at))
        .then_with(|| a.identity.cmp(&b.identity))
}

/// Drop failed / irrelevant / below-threshold entries, rank, dedupe by
/// identity (best occurrence wins), truncate to `max_count`.
pub fn select(scored: Vec<ScoredEntry>, budget: &Budget) -> Selection {
    let mut eligible: Vec<ScoredEntry> = scored
        .into_iter()
        .filter(|e| !e.is_failed())
        .filter(|e| !(budget.drop_irrelevant && e.is_relevant == Some(false)))
        .filter(|e| budget.min_score.map_or(true, |min| e.relevance_score >= min))
        .collect();

    eligible.sort_by(rank_order);

    let mut seen = HashSet::new();
    eligible.retain(|e| seen.insert(e.identity.clone()));

    if let Some(max) = budget.max_count {
        eligible.truncate(max);
    }
    Selection::from_ranked(eligible)
}
