//! Spaced-repetition scheduling engine.
//!
//! Two scheduling models share one state record: a continuous-ease model
//! kept for compatibility, and a six-stage model that decides when a card
//! comes back. On top of them sits a multi-factor scorer that picks the next
//! card relative to the one just answered, and a pool assembler that turns
//! the day's due and new cards into an ordered session.
//!
//! Zero I/O. Callers pass in `now` and the end-of-day boundary; nothing here
//! reads the clock or knows about time zones.

pub mod card;
pub mod constants;
pub mod ease;
pub mod pool;
pub mod rating;
pub mod review;
pub mod scoring;
pub mod stage;
pub mod stats;
pub mod vector;

pub use card::{Card, CardRow, CardState, Timestamp};
pub use constants::{
    DEFAULT_NEW_CARDS_PER_DAY, INITIAL_EASE, MAX_STAGE, MIN_EASE, MS_PER_DAY, STAGE_INTERVALS,
};
pub use ease::{create_initial_card_state, update_card_state};
pub use pool::{PoolSources, SessionCard, SessionRequest, assemble_session, split_pool_sources};
pub use rating::{ParseRatingError, Rating};
pub use review::{apply_review, preview_intervals};
pub use scoring::{
    CardCandidate, CurrentCard, ScoringWeights, best_candidate, calculate_card_score,
    calculate_difficulty_fit_score, calculate_keyword_relevance_score,
    calculate_similarity_score, calculate_urgency_score, select_next_card,
};
pub use stage::{StageUpdate, stage_interval_days, update_card_state_by_stage};
pub use stats::{DeckStats, deck_stats};
pub use vector::{VectorError, cosine_similarity, parse_embedding, serialize_embedding};
