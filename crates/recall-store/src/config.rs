//! `config.toml` in the data directory. Every field is optional.
//!
//! ```toml
//! new_cards_per_day = 20
//! utc_offset_hours = 9
//! session_limit = 20
//! weights = "review"          # or "keyword", or an inline table
//!
//! [embedding]
//! endpoint = "http://localhost:11434/v1/embeddings"
//! model = "nomic-embed-text"
//! api_key_env = "OPENAI_API_KEY"
//! timeout_secs = 10
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs};

use recall_core::{DEFAULT_NEW_CARDS_PER_DAY, ScoringWeights};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

pub const CONFIG_FILE: &str = "config.toml";
pub const DB_FILE: &str = "recall.db";

/// Default base directory for all recall storage.
pub fn default_data_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".recall")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightsSetting {
    Preset(String),
    Custom(ScoringWeights),
}

impl Default for WeightsSetting {
    fn default() -> Self {
        WeightsSetting::Preset("review".to_string())
    }
}

impl WeightsSetting {
    pub fn resolve(&self) -> Result<ScoringWeights> {
        match self {
            WeightsSetting::Preset(name) => ScoringWeights::preset(name).ok_or_else(|| {
                StoreError::Config(format!(
                    "unknown weights preset '{name}' (expected 'review' or 'keyword')"
                ))
            }),
            WeightsSetting::Custom(w) => {
                let all = [w.urgency, w.similarity, w.difficulty_fit, w.keyword_relevance];
                if all.iter().all(|v| v.is_finite() && *v >= 0.0) {
                    Ok(*w)
                } else {
                    Err(StoreError::Config(
                        "scoring weights must be finite and non-negative".to_string(),
                    ))
                }
            }
        }
    }
}

/// Settings for the external embedding service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible `/embeddings` URL.
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the bearer token.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub new_cards_per_day: usize,
    /// Offset used to decide where "today" ends.
    pub utc_offset_hours: i32,
    pub session_limit: usize,
    pub weights: WeightsSetting,
    pub embedding: Option<EmbeddingConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            new_cards_per_day: DEFAULT_NEW_CARDS_PER_DAY,
            utc_offset_hours: 9,
            session_limit: 20,
            weights: WeightsSetting::default(),
            embedding: None,
        }
    }
}

impl Config {
    /// Parse and validate TOML content.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load `config.toml` from a data directory.
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        Self::load(&data_dir.join(CONFIG_FILE))
    }

    fn validate(&self) -> Result<()> {
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(StoreError::Config(format!(
                "utc_offset_hours must be between -12 and 14, got {}",
                self.utc_offset_hours
            )));
        }
        self.weights.resolve()?;
        Ok(())
    }

    pub fn scoring_weights(&self) -> Result<ScoringWeights> {
        self.weights.resolve()
    }
}
