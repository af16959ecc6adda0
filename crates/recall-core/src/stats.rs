//! Per-deck counts by stage, for display.

use serde::Serialize;

use crate::card::{CardRow, Timestamp};
use crate::constants::MAX_STAGE;

/// Per-deck counts for display.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeckStats {
    pub total: usize,
    /// Never reviewed or back at stage 0.
    pub new: usize,
    /// Reviewed before and due by the boundary.
    pub due: usize,
    /// Stages 1-4.
    pub learning: usize,
    /// Stage 5.
    pub mastered: usize,
    pub by_stage: [usize; 6],
}

pub fn deck_stats(rows: &[CardRow], end_of_today: Timestamp) -> DeckStats {
    let mut stats = DeckStats {
        total: rows.len(),
        ..Default::default()
    };

    for row in rows {
        let stage = row.state.as_ref().map_or(0, |s| s.stage.min(MAX_STAGE));
        stats.by_stage[usize::from(stage)] += 1;

        if row.is_new() {
            stats.new += 1;
        } else if row.is_due_by(end_of_today) {
            stats.due += 1;
        }

        match stage {
            0 => {}
            MAX_STAGE => stats.mastered += 1,
            _ => stats.learning += 1,
        }
    }

    stats
}
