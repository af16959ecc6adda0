//! Daily pool assembly: merge due and new cards, then order them by
//! repeatedly picking the best-scoring card.
//!
//! The anchor walks through the session. Each pick becomes the anchor for
//! the next one, so consecutive cards tend to be related and close in
//! difficulty.

use std::collections::HashSet;

use serde::Serialize;

use crate::card::{Card, CardRow, CardState, Timestamp};
use crate::scoring::{CardCandidate, CurrentCard, ScoringWeights, best_candidate};

/// The two candidate sources for a session, in the order they are merged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoolSources {
    /// Cards whose review is due by the end of today.
    pub review_due: Vec<CardRow>,
    /// Unseen cards, already capped at the daily limit.
    pub new_cards: Vec<CardRow>,
}

/// Partition joined rows into the two pool sources.
///
/// Input order is preserved within each source. A row that is both due and
/// new lands in both lists; [`assemble_session`] keeps the due entry.
pub fn split_pool_sources(
    rows: &[CardRow],
    end_of_today: Timestamp,
    max_new_per_day: usize,
) -> PoolSources {
    let review_due = rows
        .iter()
        .filter(|r| r.is_due_by(end_of_today))
        .cloned()
        .collect();
    let new_cards = rows
        .iter()
        .filter(|r| r.is_new())
        .take(max_new_per_day)
        .cloned()
        .collect();
    PoolSources {
        review_due,
        new_cards,
    }
}

/// Everything needed to assemble one session.
#[derive(Clone, Debug)]
pub struct SessionRequest {
    pub sources: PoolSources,
    /// Card the user was last looking at, if any.
    pub anchor: Option<CurrentCard>,
    /// Card ids to leave out (already shown, skipped, ...).
    pub exclude: Vec<String>,
    pub limit: usize,
    pub now: Timestamp,
    pub weights: ScoringWeights,
    pub keyword_embedding: Option<Vec<f64>>,
}

/// One card in an assembled session, in presentation order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionCard {
    pub card: Card,
    /// Stored state, or display defaults for a card never reviewed.
    pub state: CardState,
    /// Score that won this position.
    pub score: f64,
}

/// Build the ordered card sequence for a session.
pub fn assemble_session(req: &SessionRequest) -> Vec<SessionCard> {
    let excluded: HashSet<&str> = req.exclude.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    let mut rows: Vec<&CardRow> = Vec::new();
    for row in req
        .sources
        .review_due
        .iter()
        .chain(req.sources.new_cards.iter())
    {
        let id = row.card.id.as_str();
        if seen.insert(id) && !excluded.contains(id) {
            rows.push(row);
        }
    }

    let mut candidates: Vec<CardCandidate> = rows.iter().map(|r| CardCandidate::from_row(r)).collect();
    let mut anchor = req.anchor.clone();
    let keyword = req.keyword_embedding.as_deref();
    let target = req.limit.min(candidates.len());
    let mut session = Vec::with_capacity(target);

    while session.len() < target {
        let Some((idx, score)) =
            best_candidate(&candidates, anchor.as_ref(), req.now, &req.weights, keyword)
        else {
            break;
        };

        // Vec::remove keeps the remaining order, which the tie-break relies on
        let picked = candidates.remove(idx);
        let row = rows.remove(idx);

        session.push(SessionCard {
            card: row.card.clone(),
            state: row.effective_state(req.now),
            score,
        });
        anchor = Some(CurrentCard::from(picked));
    }

    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::fixtures::{lapsed, row, state_at};
    use crate::constants::MS_PER_DAY;
    use crate::vector::serialize_embedding;

    const NOW: Timestamp = 1_700_000_000_000;
    const END_OF_DAY: Timestamp = NOW + 6 * 3_600_000;

    fn request(sources: PoolSources, limit: usize) -> SessionRequest {
        SessionRequest {
            sources,
            anchor: None,
            exclude: Vec::new(),
            limit,
            now: NOW,
            weights: ScoringWeights::REVIEW_PRIORITY,
            keyword_embedding: None,
        }
    }

    fn with_embedding(mut r: CardRow, v: &[f64]) -> CardRow {
        r.card.embedding = Some(serialize_embedding(v));
        r
    }

    fn ids(session: &[SessionCard]) -> Vec<&str> {
        session.iter().map(|c| c.card.id.as_str()).collect()
    }

    #[test]
    fn test_split_sources() {
        let rows = vec![
            row("due", Some(state_at(2, NOW - MS_PER_DAY))),
            row("later", Some(state_at(3, NOW + 3 * MS_PER_DAY))),
            row("fresh", None),
            row("fresh-stored", Some(state_at(0, NOW))),
            row("lapsed", Some(lapsed(NOW))),
        ];
        let sources = split_pool_sources(&rows, END_OF_DAY, 10);
        let due: Vec<&str> = sources.review_due.iter().map(|r| r.card.id.as_str()).collect();
        let new: Vec<&str> = sources.new_cards.iter().map(|r| r.card.id.as_str()).collect();
        assert_eq!(due, ["due", "lapsed"]);
        assert_eq!(new, ["fresh", "fresh-stored", "lapsed"]);
    }

    #[test]
    fn test_unseen_cards_with_state_obey_new_cap() {
        // Stored initial states are due at creation; the cap must still apply.
        let rows: Vec<CardRow> = (0..5)
            .map(|i| row(&format!("n{i}"), Some(state_at(0, NOW - MS_PER_DAY))))
            .collect();
        let sources = split_pool_sources(&rows, END_OF_DAY, 3);
        assert!(sources.review_due.is_empty());
        assert_eq!(assemble_session(&request(sources, 10)).len(), 3);
    }

    #[test]
    fn test_split_caps_new_cards() {
        let rows: Vec<CardRow> = (0..30).map(|i| row(&format!("n{i}"), None)).collect();
        let sources = split_pool_sources(&rows, END_OF_DAY, 20);
        assert_eq!(sources.new_cards.len(), 20);
        assert_eq!(sources.new_cards[0].card.id, "n0");
        assert!(sources.review_due.is_empty());
    }

    #[test]
    fn test_empty_pool_gives_empty_session() {
        assert!(assemble_session(&request(PoolSources::default(), 10)).is_empty());
    }

    #[test]
    fn test_dedup_prefers_due_entry() {
        let due = row("x", Some(lapsed(NOW - 2 * MS_PER_DAY)));
        let sources = PoolSources {
            review_due: vec![due.clone()],
            new_cards: vec![row("x", None)],
        };
        let session = assemble_session(&request(sources, 10));
        assert_eq!(session.len(), 1);
        assert_eq!(session[0].state, due.state.unwrap());
    }

    #[test]
    fn test_exclusion() {
        let sources = PoolSources {
            review_due: vec![row("a", Some(state_at(1, NOW))), row("b", Some(state_at(1, NOW)))],
            new_cards: vec![row("c", None)],
        };
        let mut req = request(sources, 10);
        req.exclude = vec!["b".to_string(), "c".to_string()];
        assert_eq!(ids(&assemble_session(&req)), ["a"]);
    }

    #[test]
    fn test_limit_bounds_session() {
        let sources = PoolSources {
            review_due: vec![],
            new_cards: (0..5).map(|i| row(&format!("n{i}"), None)).collect(),
        };
        assert_eq!(assemble_session(&request(sources.clone(), 3)).len(), 3);
        assert_eq!(assemble_session(&request(sources.clone(), 0)).len(), 0);
        assert_eq!(assemble_session(&request(sources, 50)).len(), 5);
    }

    #[test]
    fn test_new_cards_get_display_defaults() {
        let sources = PoolSources {
            review_due: vec![],
            new_cards: vec![row("n", None)],
        };
        let session = assemble_session(&request(sources, 1));
        let s = &session[0].state;
        assert_eq!(s.ease, 2.3);
        assert_eq!(s.interval_days, 1);
        assert_eq!(s.rep_count, 0);
        assert_eq!(s.next_review_at, NOW);
        assert_eq!(s.stage, 0);
    }

    #[test]
    fn test_most_overdue_first() {
        let sources = PoolSources {
            review_due: vec![
                row("1d", Some(state_at(2, NOW - MS_PER_DAY))),
                row("20d", Some(state_at(2, NOW - 20 * MS_PER_DAY))),
                row("5d", Some(state_at(2, NOW - 5 * MS_PER_DAY))),
            ],
            new_cards: vec![],
        };
        let mut req = request(sources, 3);
        req.weights = ScoringWeights {
            urgency: 1.0,
            similarity: 0.0,
            difficulty_fit: 0.0,
            keyword_relevance: 0.0,
        };
        assert_eq!(ids(&assemble_session(&req)), ["20d", "5d", "1d"]);
    }

    #[test]
    fn test_anchor_walks_through_session() {
        // Only similarity counts. Against the fixed starting anchor the
        // order would be a, b, c; once "a" becomes the anchor, "c" is the
        // closer of the two that remain.
        let due = |id: &str, v: &[f64]| with_embedding(row(id, Some(state_at(2, NOW))), v);
        let sources = PoolSources {
            review_due: vec![
                due("b", &[0.6, -0.8]),
                due("c", &[0.0, 1.0]),
                due("a", &[0.8, 0.6]),
            ],
            new_cards: vec![],
        };
        let mut req = request(sources, 3);
        req.weights = ScoringWeights {
            urgency: 0.0,
            similarity: 1.0,
            difficulty_fit: 0.0,
            keyword_relevance: 0.0,
        };
        req.anchor = Some(CurrentCard {
            id: "start".to_string(),
            embedding: Some(vec![1.0, 0.0]),
            difficulty: None,
        });
        assert_eq!(ids(&assemble_session(&req)), ["a", "c", "b"]);
    }

    #[test]
    fn test_keyword_steers_selection() {
        let new = |id: &str, v: &[f64]| with_embedding(row(id, None), v);
        let sources = PoolSources {
            review_due: vec![],
            new_cards: vec![new("off-topic", &[0.0, 1.0]), new("on-topic", &[1.0, 0.0])],
        };
        let mut req = request(sources, 1);
        req.weights = ScoringWeights::KEYWORD_PRIORITY;
        req.keyword_embedding = Some(vec![1.0, 0.0]);
        assert_eq!(ids(&assemble_session(&req)), ["on-topic"]);
    }

    #[test]
    fn test_equal_scores_keep_source_order() {
        let sources = PoolSources {
            review_due: vec![row("d1", Some(state_at(1, NOW))), row("d2", Some(state_at(1, NOW)))],
            new_cards: vec![row("n1", Some(state_at(0, NOW))), row("n2", Some(state_at(0, NOW)))],
        };
        assert_eq!(ids(&assemble_session(&request(sources, 4))), ["d1", "d2", "n1", "n2"]);
    }
}
