//! Integration tests exercising the full review loop:
//! rows → pool → session → ratings → new state → next day's pool.

use recall_core::{
    Card, CardCandidate, CardRow, CardState, CurrentCard, MS_PER_DAY, PoolSources, Rating,
    ScoringWeights, SessionRequest, apply_review, assemble_session,
    calculate_difficulty_fit_score, create_initial_card_state, select_next_card,
    serialize_embedding, split_pool_sources, update_card_state, update_card_state_by_stage,
};

const DAY0: i64 = 1_767_225_600_000; // 2026-01-01T00:00:00Z

fn card(id: &str, difficulty: Option<u8>, embedding: &[f64]) -> Card {
    Card {
        id: id.to_string(),
        question: format!("What is {id}?"),
        answer: format!("{id} is a test card"),
        category: Some("test".to_string()),
        difficulty,
        embedding: Some(serialize_embedding(embedding)),
        created_at: DAY0,
    }
}

fn request(sources: PoolSources, now: i64, limit: usize) -> SessionRequest {
    SessionRequest {
        sources,
        anchor: None,
        exclude: Vec::new(),
        limit,
        now,
        weights: ScoringWeights::REVIEW_PRIORITY,
        keyword_embedding: None,
    }
}

/// Scenario: a stage-2 card rated good moves to stage 3, one week out.
#[test]
fn stage_two_good_schedules_one_week() {
    let u = update_card_state_by_stage(2, Rating::Good, DAY0);
    assert_eq!(u.stage, 3);
    assert_eq!(u.next_review_at, DAY0 + 7 * MS_PER_DAY);
}

/// Scenario: a stage-4 card rated hard drops to stage 3, six days out.
#[test]
fn stage_four_hard_schedules_six_days() {
    let u = update_card_state_by_stage(4, Rating::Hard, DAY0);
    assert_eq!(u.stage, 3);
    assert_eq!(u.next_review_at, DAY0 + 6 * MS_PER_DAY);
}

/// Scenario: ease 2.3 / interval 1 rated good gives ease 2.35, two days.
#[test]
fn ease_good_uses_updated_ease() {
    let state = CardState {
        ease: 2.3,
        interval_days: 1,
        ..create_initial_card_state(DAY0)
    };
    let next = update_card_state(&state, Rating::Good, DAY0);
    assert!((next.ease - 2.35).abs() < 1e-9);
    assert_eq!(next.interval_days, 2);
    assert_eq!(next.next_review_at, DAY0 + 2 * MS_PER_DAY);
}

/// Scenario: with similarity weighted out, a card 40 days overdue wins
/// no matter how its embedding compares.
#[test]
fn overdue_card_selected_first_without_similarity_weight() {
    let anchor = CurrentCard::from_card(&card("anchor", Some(3), &[1.0, 0.0, 0.0]));
    let mk = |id: &str, due: i64, v: &[f64]| CardCandidate {
        id: id.to_string(),
        embedding: Some(v.to_vec()),
        difficulty: Some(3),
        category: None,
        next_review_at: Some(due),
        stage: Some(2),
    };
    let pool = vec![
        mk("twin", DAY0, &[1.0, 0.0, 0.0]),
        mk("near", DAY0 - MS_PER_DAY, &[0.9, 0.1, 0.0]),
        mk("overdue", DAY0 - 40 * MS_PER_DAY, &[-1.0, 0.0, 0.0]),
    ];
    let weights = ScoringWeights {
        similarity: 0.0,
        ..ScoringWeights::REVIEW_PRIORITY
    };
    let picked = select_next_card(&pool, Some(&anchor), DAY0, &weights, None).unwrap();
    assert_eq!(picked.id, "overdue");
}

/// Scenario: difficulty fit step function endpoints.
#[test]
fn difficulty_fit_examples() {
    assert_eq!(calculate_difficulty_fit_score(Some(3), Some(3)), 1.0);
    assert_eq!(calculate_difficulty_fit_score(Some(3), Some(7)), 0.1);
}

/// Simulates several days of study: every shown card is rated good, and
/// the next day's pool only contains what the stage model says is due.
#[test]
fn multi_day_study_loop() {
    let mut rows: Vec<CardRow> = (0..6)
        .map(|i| CardRow {
            card: card(
                &format!("c{i}"),
                Some((i % 5 + 1) as u8),
                &[1.0, i as f64 * 0.2, 0.0],
            ),
            state: None,
        })
        .collect();

    let hour = 3_600_000;
    let max_new = 4;

    // Day 0: only the new-card cap applies.
    let now = DAY0 + 9 * hour;
    let sources = split_pool_sources(&rows, DAY0 + MS_PER_DAY - 1, max_new);
    assert!(sources.review_due.is_empty());
    let session = assemble_session(&request(sources, now, 10));
    assert_eq!(session.len(), max_new);

    for shown in &session {
        let row = rows.iter_mut().find(|r| r.card.id == shown.card.id).unwrap();
        let state = row.effective_state(now);
        row.state = Some(apply_review(&state, Rating::Good, now));
    }

    // Every reviewed card is now at stage 1, due tomorrow.
    let reviewed: Vec<&CardRow> = rows.iter().filter(|r| r.state.is_some()).collect();
    assert_eq!(reviewed.len(), max_new);
    for r in &reviewed {
        let s = r.state.as_ref().unwrap();
        assert_eq!(s.stage, 1);
        assert_eq!(s.next_review_at, now + MS_PER_DAY);
        assert_eq!(s.rep_count, 1);
    }

    // Day 1: the four reviewed cards are due, plus the two remaining new ones.
    let day1 = DAY0 + MS_PER_DAY;
    let now = day1 + 9 * hour;
    let sources = split_pool_sources(&rows, day1 + MS_PER_DAY - 1, max_new);
    assert_eq!(sources.review_due.len(), 4);
    assert_eq!(sources.new_cards.len(), 2);
    let session = assemble_session(&request(sources, now, 10));
    assert_eq!(session.len(), 6);

    // Due cards have zero urgency (due today, not overdue), new cards too,
    // so order follows similarity and difficulty chaining; all six appear once.
    let mut ids: Vec<&str> = session.iter().map(|c| c.card.id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, ["c0", "c1", "c2", "c3", "c4", "c5"]);

    // Day 1 ratings: one again, rest good.
    for (i, shown) in session.iter().enumerate() {
        let row = rows.iter_mut().find(|r| r.card.id == shown.card.id).unwrap();
        let state = row.effective_state(now);
        let rating = if i == 0 { Rating::Again } else { Rating::Good };
        row.state = Some(apply_review(&state, rating, now));
    }

    // The card rated again is due immediately; others are not due today.
    let sources = split_pool_sources(&rows, day1 + MS_PER_DAY - 1, max_new);
    let due: Vec<&str> = sources.review_due.iter().map(|r| r.card.id.as_str()).collect();
    assert_eq!(due, [session[0].card.id.as_str()]);
}

/// The anchor from a previous session carries into the next one.
#[test]
fn anchor_from_previous_card_steers_first_pick() {
    let rows = vec![
        CardRow {
            card: card("north", Some(2), &[0.0, 1.0]),
            state: None,
        },
        CardRow {
            card: card("east", Some(2), &[1.0, 0.0]),
            state: None,
        },
    ];
    let sources = split_pool_sources(&rows, DAY0 + MS_PER_DAY - 1, 10);
    let mut req = request(sources, DAY0, 1);
    req.anchor = Some(CurrentCard::from_card(&card("prev", Some(2), &[0.9, 0.1])));
    let session = assemble_session(&req);
    assert_eq!(session[0].card.id, "east");
}
