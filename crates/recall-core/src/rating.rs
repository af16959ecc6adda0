use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How well the user recalled a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    /// Not recalled. The card comes back the same day.
    Again,
    /// Recalled with serious difficulty.
    Hard,
    /// Recalled.
    Good,
}

impl Rating {
    pub const ALL: [Rating; 3] = [Rating::Again, Rating::Hard, Rating::Good];

    /// The persisted literal: `again`, `hard` or `good`.
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRatingError {
    pub input: String,
}

impl fmt::Display for ParseRatingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rating must be 'again', 'hard' or 'good', got '{}'",
            self.input
        )
    }
}

impl std::error::Error for ParseRatingError {}

impl FromStr for Rating {
    type Err = ParseRatingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "again" => Ok(Rating::Again),
            "hard" => Ok(Rating::Hard),
            "good" => Ok(Rating::Good),
            _ => Err(ParseRatingError {
                input: s.to_string(),
            }),
        }
    }
}
