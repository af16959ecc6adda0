//! Discrete six-stage scheduler. Authoritative for `next_review_at`.
//!
//! | stage | 0 | 1 | 2 | 3 | 4  | 5  |
//! |-------|---|---|---|---|----|----|
//! | days  | 0 | 1 | 3 | 7 | 14 | 30 |
//!
//! `again` drops two stages and shows the card again immediately. `hard`
//! drops one stage (never below 1). `good` advances through stages 0-2,
//! holds at 3 and 4 with a shortened re-confirmation interval, and keeps a
//! mastered card on a 30-day cycle.

use serde::{Deserialize, Serialize};

use crate::card::Timestamp;
use crate::constants::{HELD_STAGE_FACTOR, MAX_STAGE, MS_PER_DAY, STAGE_INTERVALS};
use crate::rating::Rating;

/// Output of the stage model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageUpdate {
    pub stage: u8,
    pub next_review_at: Timestamp,
}

impl StageUpdate {
    /// Whole days between `now` and the scheduled review.
    pub fn interval_days(&self, now: Timestamp) -> i64 {
        (self.next_review_at - now) / MS_PER_DAY
    }
}

/// Base interval for a stage. Stages above [`MAX_STAGE`] use the last entry.
pub fn stage_interval_days(stage: u8) -> u32 {
    STAGE_INTERVALS[usize::from(stage.min(MAX_STAGE))]
}

/// Compute the next stage and review time.
///
/// An out-of-range `current_stage` is treated as [`MAX_STAGE`].
pub fn update_card_state_by_stage(current_stage: u8, rating: Rating, now: Timestamp) -> StageUpdate {
    let current = current_stage.min(MAX_STAGE);

    let (stage, days) = match rating {
        Rating::Again => (current.saturating_sub(2), 0),
        Rating::Hard => {
            let stage = current.saturating_sub(1).max(1);
            (stage, stage_interval_days(stage).saturating_sub(1).max(1))
        }
        Rating::Good => match current {
            0..=2 => {
                let stage = (current + 1).min(MAX_STAGE);
                (stage, stage_interval_days(stage))
            }
            MAX_STAGE => (MAX_STAGE, stage_interval_days(MAX_STAGE)),
            held => {
                let shortened = (f64::from(stage_interval_days(held)) * HELD_STAGE_FACTOR).floor();
                (held, (shortened as u32).max(1))
            }
        },
    };

    StageUpdate {
        stage,
        next_review_at: now + i64::from(days) * MS_PER_DAY,
    }
}
