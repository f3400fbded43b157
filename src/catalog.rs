//! Word catalog client boundary.
//!
//! The catalog itself (storage, CRUD, seeding) is an external service;
//! this module only defines the lookup seam the game engine needs —
//! drawing a batch of random candidate words — plus the selection rule
//! that biases a round away from repeating the previous word.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CatalogError;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Number of candidates drawn per selection.
///
/// The draw is best-effort: a handful of candidates is enough to almost
/// always find one that differs from the previous round's word.
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// A word as served by the catalog for one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordEntry {
    /// Catalog id of the word.
    pub word_id: i64,
    /// Language-independent key.
    pub word_key: String,
    /// The translated value shown to players.
    pub word_value: String,
    /// Category this word belongs to.
    pub category_id: i64,
    /// Language of `word_value`.
    pub language: String,
}

/// Random-word lookup against the external catalog.
#[async_trait]
pub trait WordCatalog: Send + Sync {
    /// Draws up to `limit` random words from the given categories in the
    /// requested language. An empty result is not an error.
    async fn sample(&self, category_ids: &[i64], language: &str, limit: usize)
    -> Result<Vec<WordEntry>>;
}

/// Picks the round's word from a candidate batch.
///
/// Returns the first candidate whose value differs (case-insensitively)
/// from `exclude`; if every candidate matches the excluded value, falls
/// back to the first candidate. Returns `None` only for an empty batch.
#[must_use]
pub fn pick_word<'a>(candidates: &'a [WordEntry], exclude: Option<&str>) -> Option<&'a WordEntry> {
    let Some(prev) = exclude else {
        return candidates.first();
    };
    let prev = prev.to_lowercase();
    candidates
        .iter()
        .find(|c| c.word_value.to_lowercase() != prev)
        .or_else(|| candidates.first())
}

// ============================================================================
// HTTP client
// ============================================================================

/// Catalog client backed by the word service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    /// Creates a client for the catalog at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl WordCatalog for HttpCatalog {
    async fn sample(
        &self,
        category_ids: &[i64],
        language: &str,
        limit: usize,
    ) -> Result<Vec<WordEntry>> {
        let categories = category_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let url = format!("{}/words/random", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("categories", categories.as_str()),
                ("language", language),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogError::Request(format!(
                "catalog returned {}",
                response.status()
            )));
        }

        response
            .json::<Vec<WordEntry>>()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

// ============================================================================
// In-memory catalog
// ============================================================================

/// Fixed in-memory catalog for tests and offline play.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    words: Vec<WordEntry>,
}

impl StaticCatalog {
    /// Creates a catalog over the given entries.
    #[must_use]
    pub fn new(words: Vec<WordEntry>) -> Self {
        Self { words }
    }

    /// Convenience constructor: one category, sequential ids.
    #[must_use]
    pub fn from_values(category_id: i64, language: &str, values: &[&str]) -> Self {
        let words = values
            .iter()
            .enumerate()
            .map(|(i, value)| WordEntry {
                word_id: i64::try_from(i).unwrap_or(0) + 1,
                word_key: format!("word_{}", i + 1),
                word_value: (*value).to_string(),
                category_id,
                language: language.to_string(),
            })
            .collect();
        Self { words }
    }
}

#[async_trait]
impl WordCatalog for StaticCatalog {
    async fn sample(
        &self,
        category_ids: &[i64],
        language: &str,
        limit: usize,
    ) -> Result<Vec<WordEntry>> {
        let mut matching: Vec<WordEntry> = self
            .words
            .iter()
            .filter(|w| category_ids.contains(&w.category_id) && w.language == language)
            .cloned()
            .collect();
        if matching.is_empty() {
            warn!(?category_ids, language, "no words in static catalog");
        }
        matching.shuffle(&mut rand::thread_rng());
        matching.truncate(limit);
        Ok(matching)
    }
}

// ============================================================================
// Tests
// ============================================================================
