//! Combined review update: both models on one state record.

use crate::card::{CardState, Timestamp};
use crate::ease::update_card_state;
use crate::rating::Rating;
use crate::stage::{StageUpdate, update_card_state_by_stage};

/// Apply a rating with both schedulers. The stage model's review time wins.
pub fn apply_review(state: &CardState, rating: Rating, now: Timestamp) -> CardState {
    let by_stage = update_card_state_by_stage(state.stage, rating, now);
    let mut next = update_card_state(state, rating, now);
    next.stage = by_stage.stage;
    next.next_review_at = by_stage.next_review_at;
    next
}

/// What each rating would do to a card right now, for display next to
/// the rating buttons.
pub fn preview_intervals(state: &CardState, now: Timestamp) -> [(Rating, StageUpdate); 3] {
    Rating::ALL.map(|r| (r, update_card_state_by_stage(state.stage, r, now)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MS_PER_DAY;
    use approx::assert_relative_eq;

    const NOW: Timestamp = 1_700_000_000_000;

    #[test]
    fn test_stage_time_overrides_ease_time() {
        let state = CardState {
            ease: 2.3,
            interval_days: 1,
            stage: 2,
            ..CardState::initial(0)
        };
        let next = apply_review(&state, Rating::Good, NOW);

        // Ease side still advances
        assert_relative_eq!(next.ease, 2.35, epsilon = 1e-9);
        assert_eq!(next.interval_days, 2);
        assert_eq!(next.rep_count, 1);
        assert_eq!(next.last_reviewed_at, Some(NOW));

        // but the stage model decides when the card comes back
        assert_eq!(next.stage, 3);
        assert_eq!(next.next_review_at, NOW + 7 * MS_PER_DAY);
    }

    #[test]
    fn test_again_brings_card_back_now() {
        let state = CardState {
            stage: 4,
            ..CardState::initial(0)
        };
        let next = apply_review(&state, Rating::Again, NOW);
        assert_eq!(next.stage, 2);
        assert_eq!(next.next_review_at, NOW);
        // ease model alone would have said tomorrow
        assert_eq!(next.interval_days, 1);
    }

    #[test]
    fn test_preview_covers_every_rating() {
        let state = CardState {
            stage: 1,
            ..CardState::initial(0)
        };
        let preview = preview_intervals(&state, NOW);
        assert_eq!(preview[0].0, Rating::Again);
        assert_eq!(preview[0].1.interval_days(NOW), 0);
        assert_eq!(preview[1].0, Rating::Hard);
        assert_eq!(preview[1].1.interval_days(NOW), 1);
        assert_eq!(preview[2].0, Rating::Good);
        assert_eq!(preview[2].1.interval_days(NOW), 3);
    }
}
