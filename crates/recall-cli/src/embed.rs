//! Text embeddings from an external OpenAI-compatible service.
//!
//! Embeddings are optional everywhere: a provider that fails returns `None`
//! and the scorer treats the card as having no embedding.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use recall_core::Card;
use recall_store::{EmbeddingConfig, Store};
use serde::Deserialize;

pub trait EmbeddingProvider {
    fn embed(&self, text: &str) -> impl Future<Output = Option<Vec<f64>>> + Send;
}

/// Text sent to the provider for a card.
pub fn card_text(question: &str, answer: &str) -> String {
    format!("{question}\n{answer}")
}

pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f64>,
}

impl HttpEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        let api_key = match &config.api_key_env {
            Some(var) => {
                let key = std::env::var(var).ok();
                if key.is_none() {
                    tracing::warn!("embedding api key variable {var} is not set");
                }
                key
            }
            None => None,
        };

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    async fn request(&self, text: &str) -> Result<Vec<f64>> {
        let body = serde_json::json!({ "model": self.model, "input": text });
        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.context("request failed")?;
        let status = resp.status();
        if !status.is_success() {
            bail!("provider returned {status}");
        }
        let parsed: EmbeddingResponse = resp.json().await.context("malformed response")?;
        first_embedding(parsed)
    }
}

fn first_embedding(resp: EmbeddingResponse) -> Result<Vec<f64>> {
    let Some(item) = resp.data.into_iter().next() else {
        bail!("response contained no embeddings");
    };
    if item.embedding.is_empty() || item.embedding.iter().any(|v| !v.is_finite()) {
        bail!("response embedding is empty or not finite");
    }
    Ok(item.embedding)
}

impl EmbeddingProvider for HttpEmbedder {
    async fn embed(&self, text: &str) -> Option<Vec<f64>> {
        match self.request(text).await {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("embedding via {} failed: {e:#}", self.endpoint);
                None
            }
        }
    }
}

/// Build the configured provider, if any.
pub fn provider_from_config(config: Option<&EmbeddingConfig>) -> Result<Option<HttpEmbedder>> {
    config.map(HttpEmbedder::from_config).transpose()
}

/// Compute and store embeddings. Returns `(embedded, attempted)`.
pub async fn embed_cards<P: EmbeddingProvider>(
    store: &Store,
    provider: &P,
    cards: &[Card],
) -> Result<(usize, usize)> {
    let mut embedded = 0;
    for card in cards {
        let Some(vector) = provider.embed(&card_text(&card.question, &card.answer)).await else {
            continue;
        };
        store
            .set_embedding(&card.id, Some(&vector))
            .with_context(|| format!("failed to store embedding for {}", card.id))?;
        tracing::debug!("embedded {} ({} dims)", card.id, vector.len());
        embedded += 1;
    }
    Ok((embedded, cards.len()))
}
