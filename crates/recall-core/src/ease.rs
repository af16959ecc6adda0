//! Continuous-ease scheduler (SM-2 family).
//!
//! Kept for compatibility and display. When both models run, the stage
//! model decides `next_review_at` (see [`crate::review::apply_review`]).

use crate::card::{CardState, Timestamp};
use crate::constants::{
    AGAIN_EASE_PENALTY, EASE_STEP, HARD_INTERVAL_FACTOR, INITIAL_INTERVAL_DAYS, MIN_EASE,
    MS_PER_DAY,
};
use crate::rating::Rating;

/// State for a card created at `now`.
pub fn create_initial_card_state(now: Timestamp) -> CardState {
    CardState::initial(now)
}

/// Apply a rating to the ease fields of `state`.
///
/// - `again`: ease drops by 0.3, interval resets to 1 day.
/// - `hard`: ease drops by 0.05, interval grows by 1.2×.
/// - `good`: ease rises by 0.05, interval grows by the *new* ease.
///
/// Ease never goes below [`MIN_EASE`]. Intervals are floored, so a zero
/// interval stays zero under `hard`/`good` and the card is due at `now`.
/// `stage` is carried through untouched.
pub fn update_card_state(state: &CardState, rating: Rating, now: Timestamp) -> CardState {
    let (ease, interval_days) = match rating {
        Rating::Again => (
            (state.ease - AGAIN_EASE_PENALTY).max(MIN_EASE),
            INITIAL_INTERVAL_DAYS,
        ),
        Rating::Hard => (
            (state.ease - EASE_STEP).max(MIN_EASE),
            grow_interval(state.interval_days, HARD_INTERVAL_FACTOR),
        ),
        Rating::Good => {
            let ease = state.ease + EASE_STEP;
            (ease, grow_interval(state.interval_days, ease))
        }
    };

    CardState {
        ease,
        interval_days,
        rep_count: state.rep_count.saturating_add(1),
        next_review_at: now + i64::from(interval_days) * MS_PER_DAY,
        last_reviewed_at: Some(now),
        stage: state.stage,
    }
}

fn grow_interval(days: u32, factor: f64) -> u32 {
    // `as` saturates at u32::MAX, which is far past any realistic interval
    (f64::from(days) * factor).floor() as u32
}
