use std::sync::Arc;

use recall_core::{
    CardState, Rating, ScoringWeights, SessionCard, Timestamp, preview_intervals,
};
use recall_store::{
    Config, NewCard, SessionOptions, Store, StoreError, format_timestamp, now_millis,
};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::embed::{EmbeddingProvider, HttpEmbedder, card_text};

#[derive(Clone)]
pub struct RecallServer {
    state: Arc<Mutex<ServerState>>,
    embedder: Option<Arc<HttpEmbedder>>,
    tool_router: ToolRouter<Self>,
}

struct ServerState {
    store: Store,
    config: Config,
}

impl RecallServer {
    pub fn new(store: Store, config: Config, embedder: Option<HttpEmbedder>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState { store, config })),
            embedder: embedder.map(Arc::new),
            tool_router: Self::tool_router(),
        }
    }

    async fn embed(&self, text: Option<&str>) -> Option<Vec<f64>> {
        match (&self.embedder, text) {
            (Some(e), Some(t)) => e.embed(t).await,
            _ => None,
        }
    }

    fn preview_json(state: &CardState, now: Timestamp, utc_offset_hours: i32) -> serde_json::Value {
        let mut preview = serde_json::Map::new();
        for (rating, update) in preview_intervals(state, now) {
            preview.insert(
                rating.as_str().to_string(),
                serde_json::json!({
                    "stage": update.stage,
                    "interval_days": update.interval_days(now),
                    "next_review": format_timestamp(update.next_review_at, utc_offset_hours),
                }),
            );
        }
        serde_json::Value::Object(preview)
    }

    fn session_json(
        session: &[SessionCard],
        now: Timestamp,
        utc_offset_hours: i32,
    ) -> serde_json::Value {
        let cards: Vec<serde_json::Value> = session
            .iter()
            .map(|sc| {
                serde_json::json!({
                    "id": sc.card.id,
                    "question": sc.card.question,
                    "answer": sc.card.answer,
                    "category": sc.card.category,
                    "difficulty": sc.card.difficulty,
                    "stage": sc.state.stage,
                    "ease": sc.state.ease,
                    "next_review_at": sc.state.next_review_at,
                    "next_review": format_timestamp(sc.state.next_review_at, utc_offset_hours),
                    "score": sc.score,
                    "preview": Self::preview_json(&sc.state, now, utc_offset_hours),
                })
            })
            .collect();
        serde_json::json!({
            "count": cards.len(),
            "cards": cards,
        })
    }
}

fn store_error(e: StoreError) -> McpError {
    match e {
        StoreError::NotFound(_) | StoreError::InvalidData(_) => {
            McpError::invalid_params(e.to_string(), None)
        }
        _ => McpError::internal_error(e.to_string(), None),
    }
}

fn json_result(value: &serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )])
}

// --- Tool parameter types ---

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct NextRequest {
    /// Maximum number of cards to return (defaults to the configured session limit)
    limit: Option<usize>,
    /// Id of the card the user just answered. The session starts from cards
    /// similar to it in content and difficulty.
    after: Option<String>,
    /// Card ids to leave out, e.g. cards already shown in this session
    exclude: Option<Vec<String>>,
    /// Optional topic text. Cards semantically close to it are preferred
    /// when an embedding provider is configured.
    keyword: Option<String>,
    /// Weight preset: "review" (due cards first) or "keyword" (topic first)
    weights: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ReviewRequest {
    /// Card id
    id: String,
    /// "again" (forgot), "hard" (barely recalled) or "good" (recalled)
    rating: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct AddRequest {
    question: String,
    answer: String,
    category: Option<String>,
    /// 1 (easy) to 5 (hard)
    difficulty: Option<u8>,
}

#[tool_router]
impl RecallServer {
    #[tool(
        description = "Get the next cards to study, in presentation order. Due reviews and today's new cards are merged and ordered so that each card follows a related one of similar difficulty. Pass `after` with the id of the card just answered to continue a session, and `exclude` for cards already shown."
    )]
    async fn recall_next(
        &self,
        Parameters(req): Parameters<NextRequest>,
    ) -> Result<CallToolResult, McpError> {
        let weights = match req.weights.as_deref() {
            Some(name) => Some(ScoringWeights::preset(name).ok_or_else(|| {
                McpError::invalid_params(
                    format!("unknown weights preset '{name}' (expected 'review' or 'keyword')"),
                    None,
                )
            })?),
            None => None,
        };
        if req.keyword.is_some() && self.embedder.is_none() {
            tracing::warn!("keyword ignored: no embedding provider configured");
        }
        let keyword_embedding = self.embed(req.keyword.as_deref()).await;

        let state = self.state.lock().await;
        let opts = SessionOptions {
            limit: req.limit,
            after: req.after,
            exclude: req.exclude.unwrap_or_default(),
            weights,
            keyword_embedding,
        };
        let now = now_millis();
        let session = state
            .store
            .next_session(&state.config, &opts, now)
            .map_err(store_error)?;

        Ok(json_result(&Self::session_json(
            &session,
            now,
            state.config.utc_offset_hours,
        )))
    }

    #[tool(
        description = "Record how well the user recalled a card: again, hard or good. Returns the card's new stage (0-5) and when it is due next."
    )]
    async fn recall_review(
        &self,
        Parameters(req): Parameters<ReviewRequest>,
    ) -> Result<CallToolResult, McpError> {
        let rating: Rating = req
            .rating
            .parse()
            .map_err(|e: recall_core::ParseRatingError| {
                McpError::invalid_params(e.to_string(), None)
            })?;

        let state = self.state.lock().await;
        let updated = state
            .store
            .record_review(&req.id, rating, now_millis())
            .map_err(store_error)?;

        let result = serde_json::json!({
            "id": req.id,
            "rating": rating,
            "stage": updated.stage,
            "ease": updated.ease,
            "interval_days": updated.interval_days,
            "rep_count": updated.rep_count,
            "next_review_at": updated.next_review_at,
            "next_review": format_timestamp(updated.next_review_at, state.config.utc_offset_hours),
        });
        Ok(json_result(&result))
    }

    #[tool(
        description = "Add a flashcard. Difficulty is optional, 1 (easy) to 5 (hard). An embedding is computed when a provider is configured."
    )]
    async fn recall_add(
        &self,
        Parameters(req): Parameters<AddRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = card_text(&req.question, &req.answer);
        let embedding = self.embed(Some(&text)).await;

        let state = self.state.lock().await;
        let card = state
            .store
            .add_card(
                &NewCard {
                    question: req.question,
                    answer: req.answer,
                    category: req.category,
                    difficulty: req.difficulty,
                    embedding,
                },
                now_millis(),
            )
            .map_err(store_error)?;

        let result = serde_json::json!({
            "id": card.id,
            "created_at": card.created_at,
            "embedded": card.embedding.is_some(),
        });
        Ok(json_result(&result))
    }

    #[tool(description = "Deck statistics: totals per stage, due and new counts, reviews today.")]
    async fn recall_stats(&self) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let report = state
            .store
            .stats_report(&state.config, now_millis())
            .map_err(store_error)?;
        let value = serde_json::to_value(&report)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(json_result(&value))
    }
}

#[tool_handler]
impl ServerHandler for RecallServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Spaced-repetition flashcards.\n\n\
                 STUDY LOOP:\n\
                 1. Call recall_next to get the session. Show one card's question at a time.\n\
                 2. After the user answers, reveal the answer and ask how it went, then call \
                    recall_review with again, hard or good.\n\
                 3. Continue with the next card in the list. When the list runs out, call \
                    recall_next again with `after` set to the last card's id.\n\n\
                 Use recall_add when the user wants to learn something new and recall_stats \
                 to report progress."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
