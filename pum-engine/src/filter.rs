//! Local re-filtering and ranking of cached source results.
//!
//! Runs whenever the user extends the typed prefix and no source needs a
//! re-query: the cached union is matched against the new input and
//! ordered by match quality, recency and the configured tie-break.

use std::cmp::Ordering;

use pum_core::{Config, Item, RecencyMap, SortMethod};

use crate::session::SourceResult;

/// How long ago a commit still boosts an item, in milliseconds.
const RECENCY_WINDOW_MS: u64 = 5 * 60 * 1000;

/// An item that survived filtering, tagged with the index of the source
/// that produced it.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub source: usize,
    pub item: Item,
}

pub(crate) fn rank(
    results: &[SourceResult],
    input: &str,
    config: &Config,
    recency: &RecencyMap,
    bufnr: u64,
    now_ms: u64,
) -> Vec<Candidate> {
    let mut scored: Vec<(f64, Candidate)> = Vec::new();
    for (source, result) in results.iter().enumerate() {
        for item in &result.items {
            let Some(tier) = match_tier(&item.word, input, item.icase) else {
                continue;
            };
            let score = tier as f64
                + recency_bonus(recency, bufnr, &item.word, now_ms, config.locality_bonus);
            scored.push((score, Candidate { source, item: item.clone() }));
        }
    }
    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| tie_break(&a.item, &b.item, config.default_sort_method))
    });
    scored.into_iter().map(|(_, candidate)| candidate).collect()
}

/// Match quality: case-exact prefix beats case-folded prefix beats
/// in-order subsequence. `None` drops the item.
fn match_tier(word: &str, input: &str, icase: bool) -> Option<u32> {
    if input.is_empty() {
        return Some(1);
    }
    if word.starts_with(input) {
        return Some(3);
    }
    if icase {
        let word_lower = word.to_lowercase();
        let input_lower = input.to_lowercase();
        if word_lower.starts_with(&input_lower) {
            return Some(2);
        }
        if is_subsequence(&word_lower, &input_lower) {
            return Some(1);
        }
        return None;
    }
    is_subsequence(word, input).then_some(1)
}

fn is_subsequence(word: &str, input: &str) -> bool {
    let mut chars = word.chars();
    input.chars().all(|needle| chars.any(|ch| ch == needle))
}

/// Bonus in `[0, 1)` so match tiers always dominate: a recently committed
/// word floats to the top of its tier, same-buffer commits doubly so when
/// the locality bonus is on.
fn recency_bonus(
    recency: &RecencyMap,
    bufnr: u64,
    word: &str,
    now_ms: u64,
    locality: bool,
) -> f64 {
    let (seen, weight) = match recency.last_seen(bufnr, word) {
        Some(seen) if locality => (seen, 1.0),
        Some(seen) => (seen, 0.5),
        None => match recency.last_seen_anywhere(word) {
            Some(seen) => (seen, 0.5),
            None => return 0.0,
        },
    };
    let age = now_ms.saturating_sub(seen);
    if age >= RECENCY_WINDOW_MS {
        return 0.0;
    }
    0.9 * weight * (1.0 - age as f64 / RECENCY_WINDOW_MS as f64)
}

fn tie_break(a: &Item, b: &Item, method: SortMethod) -> Ordering {
    match method {
        SortMethod::Length => a.word.len().cmp(&b.word.len()),
        SortMethod::Alphabetical => a.word.cmp(&b.word),
        SortMethod::None => Ordering::Equal,
    }
}
