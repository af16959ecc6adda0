//! Loads today's pool and hands it to the session assembler.

use recall_core::{
    CurrentCard, DeckStats, MS_PER_DAY, ScoringWeights, SessionCard, SessionRequest, Timestamp,
    assemble_session, deck_stats,
};
use serde::Serialize;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::store::Store;
use crate::time::end_of_day;

/// Caller-side knobs for one `next` request.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Overrides `Config::session_limit`.
    pub limit: Option<usize>,
    /// Id of the card just answered; becomes the initial anchor.
    pub after: Option<String>,
    pub exclude: Vec<String>,
    /// Overrides the configured weights.
    pub weights: Option<ScoringWeights>,
    pub keyword_embedding: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    #[serde(flatten)]
    pub deck: DeckStats,
    pub reviewed_today: usize,
}

impl Store {
    /// Assemble the session for the local day containing `now`.
    pub fn next_session(
        &self,
        config: &Config,
        opts: &SessionOptions,
        now: Timestamp,
    ) -> Result<Vec<SessionCard>> {
        let end = end_of_day(now, config.utc_offset_hours);
        let sources = self.session_sources(end, config.new_cards_per_day)?;

        let mut exclude = opts.exclude.clone();
        let anchor = match &opts.after {
            Some(id) => {
                let card = self
                    .get_card(id)?
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?;
                exclude.push(card.id.clone());
                Some(CurrentCard::from_card(&card))
            }
            None => None,
        };

        let weights = match opts.weights {
            Some(w) => w,
            None => config.scoring_weights()?,
        };

        let req = SessionRequest {
            sources,
            anchor,
            exclude,
            limit: opts.limit.unwrap_or(config.session_limit),
            now,
            weights,
            keyword_embedding: opts.keyword_embedding.clone(),
        };
        let session = assemble_session(&req);

        for (pos, sc) in session.iter().enumerate() {
            tracing::debug!("pick {pos}: {} score={:.4}", sc.card.id, sc.score);
        }
        Ok(session)
    }

    /// Deck statistics plus the number of reviews since local midnight.
    pub fn stats_report(&self, config: &Config, now: Timestamp) -> Result<StatsReport> {
        let end = end_of_day(now, config.utc_offset_hours);
        let rows = self.list_rows()?;
        Ok(StatsReport {
            deck: deck_stats(&rows, end),
            reviewed_today: self.review_count_since(end - MS_PER_DAY + 1)?,
        })
    }
}
