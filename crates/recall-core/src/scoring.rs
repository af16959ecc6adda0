//! Multi-factor card selection.
//!
//! Each candidate gets four sub-scores in [0, 1]:
//!
//! - **urgency**: how overdue the review is, saturating at 30 days
//! - **similarity**: embedding closeness to the anchor (the card just answered)
//! - **difficulty fit**: how close its difficulty is to the anchor's
//! - **keyword relevance**: embedding closeness to an optional keyword vector
//!
//! The final score is a plain weighted sum. Weights are not normalized.
//! Missing or unusable data contributes a neutral value instead of failing.

use serde::{Deserialize, Serialize};

use crate::card::{Card, CardRow, Timestamp};
use crate::constants::{MS_PER_DAY, NEUTRAL_DIFFICULTY_FIT, URGENCY_SATURATION_DAYS};
use crate::vector::{cosine_similarity, parse_embedding};

/// Linear-combination coefficients for the four sub-scores.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    pub urgency: f64,
    pub similarity: f64,
    pub difficulty_fit: f64,
    pub keyword_relevance: f64,
}

impl ScoringWeights {
    /// Overdue cards first, with some topical continuity.
    pub const REVIEW_PRIORITY: ScoringWeights = ScoringWeights {
        urgency: 0.5,
        similarity: 0.2,
        difficulty_fit: 0.2,
        keyword_relevance: 0.1,
    };

    /// Cards matching the session keyword first.
    pub const KEYWORD_PRIORITY: ScoringWeights = ScoringWeights {
        urgency: 0.2,
        similarity: 0.1,
        difficulty_fit: 0.1,
        keyword_relevance: 0.6,
    };

    /// Look up a named preset: `review` or `keyword`.
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "review" => Some(Self::REVIEW_PRIORITY),
            "keyword" => Some(Self::KEYWORD_PRIORITY),
            _ => None,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::REVIEW_PRIORITY
    }
}

/// A card normalized for one selection pass. Embedding already parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct CardCandidate {
    pub id: String,
    pub embedding: Option<Vec<f64>>,
    pub difficulty: Option<u8>,
    pub category: Option<String>,
    pub next_review_at: Option<Timestamp>,
    pub stage: Option<u8>,
}

impl CardCandidate {
    pub fn from_row(row: &CardRow) -> Self {
        Self {
            id: row.card.id.clone(),
            embedding: row.card.embedding.as_deref().and_then(parse_embedding),
            difficulty: row.card.difficulty,
            category: row.card.category.clone(),
            next_review_at: row.state.as_ref().map(|s| s.next_review_at),
            stage: row.state.as_ref().map(|s| s.stage),
        }
    }
}

/// The card the user just answered; similarity and difficulty fit are
/// measured against it.
#[derive(Clone, Debug, PartialEq)]
pub struct CurrentCard {
    pub id: String,
    pub embedding: Option<Vec<f64>>,
    pub difficulty: Option<u8>,
}

impl CurrentCard {
    pub fn from_card(card: &Card) -> Self {
        Self {
            id: card.id.clone(),
            embedding: card.embedding.as_deref().and_then(parse_embedding),
            difficulty: card.difficulty,
        }
    }
}

impl From<CardCandidate> for CurrentCard {
    fn from(c: CardCandidate) -> Self {
        Self {
            id: c.id,
            embedding: c.embedding,
            difficulty: c.difficulty,
        }
    }
}

/// 1.0 for a card never scheduled; otherwise days overdue / 30, capped at 1.
pub fn calculate_urgency_score(next_review_at: Option<Timestamp>, now: Timestamp) -> f64 {
    let Some(due) = next_review_at else {
        return 1.0;
    };
    let days_overdue = ((now - due) as f64 / MS_PER_DAY as f64).max(0.0);
    (days_overdue / URGENCY_SATURATION_DAYS).min(1.0)
}

/// Cosine similarity remapped from [-1, 1] to [0, 1]; 0 when unusable.
fn remapped_similarity(a: &[f64], b: &[f64]) -> f64 {
    match cosine_similarity(a, b) {
        Ok(sim) if sim.is_finite() => (sim + 1.0) / 2.0,
        _ => 0.0,
    }
}

/// Similarity to the anchor. 0 without an anchor or either embedding.
pub fn calculate_similarity_score(anchor: Option<&CurrentCard>, candidate: Option<&[f64]>) -> f64 {
    match (anchor.and_then(|a| a.embedding.as_deref()), candidate) {
        (Some(a), Some(c)) => remapped_similarity(a, c),
        _ => 0.0,
    }
}

/// Step function of the difficulty gap; 0.5 when either side is unknown.
pub fn calculate_difficulty_fit_score(anchor: Option<u8>, candidate: Option<u8>) -> f64 {
    let (Some(a), Some(c)) = (anchor, candidate) else {
        return NEUTRAL_DIFFICULTY_FIT;
    };
    match a.abs_diff(c) {
        0..=1 => 1.0,
        2 => 0.7,
        3 => 0.4,
        _ => 0.1,
    }
}

/// Similarity to the session keyword vector. 0 when either is missing.
pub fn calculate_keyword_relevance_score(keyword: Option<&[f64]>, candidate: Option<&[f64]>) -> f64 {
    match (keyword, candidate) {
        (Some(k), Some(c)) => remapped_similarity(k, c),
        _ => 0.0,
    }
}

/// Weighted sum of the four sub-scores.
pub fn calculate_card_score(
    candidate: &CardCandidate,
    current: Option<&CurrentCard>,
    now: Timestamp,
    weights: &ScoringWeights,
    keyword_embedding: Option<&[f64]>,
) -> f64 {
    let embedding = candidate.embedding.as_deref();

    let urgency = calculate_urgency_score(candidate.next_review_at, now);
    let similarity = calculate_similarity_score(current, embedding);
    let difficulty_fit = calculate_difficulty_fit_score(
        current.and_then(|c| c.difficulty),
        candidate.difficulty,
    );
    let keyword = calculate_keyword_relevance_score(keyword_embedding, embedding);

    weights.urgency * urgency
        + weights.similarity * similarity
        + weights.difficulty_fit * difficulty_fit
        + weights.keyword_relevance * keyword
}

/// Index and score of the best candidate.
///
/// Ties keep the earliest candidate, so the result depends on input order.
pub fn best_candidate(
    candidates: &[CardCandidate],
    current: Option<&CurrentCard>,
    now: Timestamp,
    weights: &ScoringWeights,
    keyword_embedding: Option<&[f64]>,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let score = calculate_card_score(candidate, current, now, weights, keyword_embedding);
        let better = match best {
            None => true,
            Some((_, best_score)) => score > best_score,
        };
        if better {
            best = Some((i, score));
        }
    }
    best
}

/// Pick the highest-scoring candidate, or `None` for an empty slice.
pub fn select_next_card<'a>(
    candidates: &'a [CardCandidate],
    current: Option<&CurrentCard>,
    now: Timestamp,
    weights: &ScoringWeights,
    keyword_embedding: Option<&[f64]>,
) -> Option<&'a CardCandidate> {
    best_candidate(candidates, current, now, weights, keyword_embedding).map(|(i, _)| &candidates[i])
}
