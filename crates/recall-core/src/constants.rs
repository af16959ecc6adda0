/// Milliseconds in one day. All timestamps are epoch milliseconds (UTC).
pub const MS_PER_DAY: i64 = 86_400_000;

// --- Ease model ---

/// Ease assigned to a freshly created card.
pub const INITIAL_EASE: f64 = 2.3;

/// Lower bound on ease. Applied on every path that lowers it.
pub const MIN_EASE: f64 = 1.2;

/// Ease penalty for an `again` rating.
pub const AGAIN_EASE_PENALTY: f64 = 0.3;

/// Ease step for `hard` (subtracted) and `good` (added).
pub const EASE_STEP: f64 = 0.05;

/// Interval growth factor for a `hard` rating.
pub const HARD_INTERVAL_FACTOR: f64 = 1.2;

/// Interval (days) assigned to a new card and to a card rated `again`.
pub const INITIAL_INTERVAL_DAYS: u32 = 1;

// --- Stage model ---

/// Highest stage (mastered).
pub const MAX_STAGE: u8 = 5;

/// Review interval in days for each stage, indexed by stage.
pub const STAGE_INTERVALS: [u32; 6] = [0, 1, 3, 7, 14, 30];

/// Shortening factor for the re-confirmation interval at stages 3 and 4.
pub const HELD_STAGE_FACTOR: f64 = 0.7;

// --- Scoring ---

/// Days overdue at which urgency saturates at 1.0.
pub const URGENCY_SATURATION_DAYS: f64 = 30.0;

/// Difficulty fit when either side has no difficulty (or there is no anchor).
pub const NEUTRAL_DIFFICULTY_FIT: f64 = 0.5;

// --- Pool ---

/// Default cap on new cards introduced per day.
pub const DEFAULT_NEW_CARDS_PER_DAY: usize = 20;
