//! In-memory similarity index over the training examples.

use tracing::{debug, warn};

use crate::cache::{CacheStats, EmbeddingCache};
use crate::embedder::Embedder;
use crate::similarity::{SimilarityResult, cosine_similarity, rank};

/// Default minimum similarity a result must exceed.
pub const DEFAULT_MIN_SCORE: f32 = 0.3;

/// Default number of results returned per query.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Brute-force cosine index over a fixed list of texts.
///
/// The texts are embedded lazily on first use; see [`EmbeddingCache`].
pub struct LocalIndex {
    /// Indexed texts, in insertion order.
    texts: Vec<String>,

    /// Embeddings aligned with `texts`.
    cache: EmbeddingCache,

    /// Produces both training and query embeddings.
    embedder: Embedder,
}

impl LocalIndex {
    /// Create an index over `texts`. Nothing is embedded until the first query.
    pub fn new(texts: Vec<String>, embedder: Embedder) -> Self {
        Self {
            texts,
            cache: EmbeddingCache::new(),
            embedder,
        }
    }

    /// Get the number of indexed texts.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Embed every indexed text if that has not happened yet.
    pub async fn ensure_populated(&self) -> bool {
        self.cache.ensure_populated(&self.texts, &self.embedder).await
    }

    /// Forget all embeddings; the next query re-embeds.
    pub async fn reset(&self) {
        self.cache.reset().await;
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Find up to `k` indexed texts scoring strictly above `min_score`.
    ///
    /// Returns an empty list when the query cannot be embedded.
    pub async fn query(&self, text: &str, k: usize, min_score: f32) -> Vec<SimilarityResult> {
        self.ensure_populated().await;

        let Some(query) = self.embedder.embed(text).await else {
            debug!("No query embedding available, local index returns nothing");
            return Vec::new();
        };

        let embeddings = self.cache.snapshot().await;
        let mut candidates = Vec::with_capacity(embeddings.len());

        for (i, (text, embedding)) in self.texts.iter().zip(embeddings.iter()).enumerate() {
            let Some(embedding) = embedding else {
                continue;
            };
            match cosine_similarity(&query, embedding) {
                Ok(score) => candidates.push(SimilarityResult::new(text.clone(), score)),
                Err(e) => warn!("Skipping training example {i}: {e}"),
            }
        }

        let results = rank(candidates, k, min_score);
        debug!("Local index matched {} examples", results.len());
        results
    }
}
