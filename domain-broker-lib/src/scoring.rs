//! Rank score and ordering of suggestion candidates.

use crate::config::ScoringConfig;
use crate::types::{Money, TldRecord};
use std::cmp::Ordering;

/// A priced candidate before availability is known.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub label: String,
    pub tld: String,
    pub domain: String,
    pub score: i64,
    pub price: Money,
    pub priority: i32,
    pub variant: bool,
}

/// Composite rank score of one label on one TLD.
///
/// TLD priority dominates; the country and industry bonuses lift matching
/// TLDs, and generated variants pay a fixed penalty so they always sort
/// below the bare label on the same TLD.
pub fn score(
    record: &TldRecord,
    country: Option<&str>,
    industry: Option<&str>,
    variant: bool,
    weights: &ScoringConfig,
) -> i64 {
    // Weights come from user config; saturate rather than overflow.
    let mut score = i64::from(record.priority).saturating_mul(weights.priority_weight);

    if country.is_some_and(|c| record.matches_country(c)) {
        score = score.saturating_add(weights.country_bonus);
    }
    if industry.is_some_and(|i| record.matches_industry(i)) {
        score = score.saturating_add(weights.industry_bonus);
    }
    if variant {
        score = score.saturating_sub(weights.variant_penalty);
    }
    score
}

/// Total order: score descending, then price, TLD and domain ascending.
pub fn rank_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.price.cmp(&b.price))
        .then_with(|| a.tld.cmp(&b.tld))
        .then_with(|| a.domain.cmp(&b.domain))
}

/// Whether a candidate deserves the "recommended" badge.
pub fn is_recommended(candidate: &ScoredCandidate, weights: &ScoringConfig) -> bool {
    !candidate.variant && candidate.priority >= weights.recommend_min_priority
}
