//! Card and card-state records as exchanged with the storage layer.
//!
//! The core never mutates a [`Card`]. A [`CardState`] holds the fields of
//! both scheduling models; each model reads and writes its own subset.

use serde::{Deserialize, Serialize};

use crate::constants::{INITIAL_EASE, INITIAL_INTERVAL_DAYS};

/// Epoch milliseconds, UTC.
pub type Timestamp = i64;

/// A flashcard as owned by the calling application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub category: Option<String>,
    /// 1 (easy) to 5 (hard).
    #[serde(default)]
    pub difficulty: Option<u8>,
    /// Serialized embedding vector, see [`crate::vector::serialize_embedding`].
    #[serde(default)]
    pub embedding: Option<String>,
    pub created_at: Timestamp,
}

/// Scheduling state for one card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    pub ease: f64,
    pub interval_days: u32,
    pub rep_count: u32,
    pub next_review_at: Timestamp,
    #[serde(default)]
    pub last_reviewed_at: Option<Timestamp>,
    /// 0 = new, 5 = mastered.
    #[serde(default)]
    pub stage: u8,
}

impl CardState {
    /// State for a card that was just created: due immediately, stage 0.
    ///
    /// The same values serve as display defaults for cards that have no
    /// state row yet.
    pub fn initial(now: Timestamp) -> Self {
        Self {
            ease: INITIAL_EASE,
            interval_days: INITIAL_INTERVAL_DAYS,
            rep_count: 0,
            next_review_at: now,
            last_reviewed_at: None,
            stage: 0,
        }
    }

    pub fn is_new(&self) -> bool {
        self.stage == 0
    }
}

/// A card joined with its state, as loaded by the storage layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardRow {
    pub card: Card,
    /// Absent for cards that have never had state recorded.
    pub state: Option<CardState>,
}

impl CardRow {
    /// Whether the card has not been seen yet (no state, or stage 0).
    pub fn is_new(&self) -> bool {
        self.state.as_ref().is_none_or(CardState::is_new)
    }

    /// Whether a card that has been reviewed at least once is due on or
    /// before `boundary`.
    ///
    /// Unseen cards are never due; they enter a session only through the
    /// capped new-card source.
    pub fn is_due_by(&self, boundary: Timestamp) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.last_reviewed_at.is_some() && s.next_review_at <= boundary)
    }

    /// State with display defaults filled in for never-reviewed cards.
    pub fn effective_state(&self, now: Timestamp) -> CardState {
        self.state
            .clone()
            .unwrap_or_else(|| CardState::initial(now))
    }
}
