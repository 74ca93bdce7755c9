//! Retrieval-augmented quadrant classifier.
//!
//! A query is classified by retrieving similar labeled examples (remote
//! index first, local index as fallback) and letting each neighbor vote for
//! its label with weight `similarity * RETRIEVAL_DISCOUNT`. `DoNow` starts
//! with `BASELINE_WEIGHT`, so the result is defined even with no neighbors.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use taskmatrix_embeddings::{CacheStats, Embedder, HashingProvider, LocalIndex, SimilarityResult};
use tracing::{debug, info, warn};

use crate::category::Category;
use crate::config::{BASELINE_WEIGHT, ClassifierConfig, RETRIEVAL_DISCOUNT};
use crate::remote::RemoteIndex;
use crate::training::TrainingSet;

/// Which index answered a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalSource {
    Remote,
    Local,
}

/// Per-category vote weights for one classification.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteTally {
    weights: [f32; 4],
    total_weight: f32,
}

impl VoteTally {
    /// A tally holding only the `DoNow` baseline.
    pub fn new() -> Self {
        let mut weights = [0.0; 4];
        weights[Category::DoNow.slot()] = BASELINE_WEIGHT;
        Self {
            weights,
            total_weight: BASELINE_WEIGHT,
        }
    }

    /// Count a neighbor labeled `label` at `similarity`.
    pub fn add(&mut self, label: Category, similarity: f32) {
        let weight = similarity * RETRIEVAL_DISCOUNT;
        self.weights[label.slot()] += weight;
        self.total_weight += weight;
    }

    /// Accumulated weight for `category`.
    pub fn weight(&self, category: Category) -> f32 {
        self.weights[category.slot()]
    }

    pub fn total_weight(&self) -> f32 {
        self.total_weight
    }

    /// Each category's share of the total weight, in id order.
    pub fn normalized(&self) -> [f32; 4] {
        self.weights.map(|w| w / self.total_weight)
    }

    /// The category with the strictly greatest share, and that share.
    ///
    /// Categories are visited in id order and only a strictly greater share
    /// replaces the leader, so `DoNow` wins every tie.
    pub fn winner(&self) -> (Category, f32) {
        let scores = self.normalized();
        let mut best = (Category::DoNow, 0.0);
        for category in Category::ALL {
            let score = scores[category.slot()];
            if score > best.1 {
                best = (category, score);
            }
        }
        best
    }
}

impl Default for VoteTally {
    fn default() -> Self {
        Self::new()
    }
}

/// A retrieved example and the label it voted for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub text: String,
    pub score: f32,
    /// `None` when the text matches no training example; such neighbors
    /// do not vote.
    pub label: Option<Category>,
}

/// Full outcome of a classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,

    /// The winning category's normalized score.
    pub confidence: f32,

    /// Normalized score of every category, in id order.
    pub scores: [f32; 4],

    pub total_weight: f32,

    pub neighbors: Vec<Neighbor>,

    pub source: RetrievalSource,
}

/// Request counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierStats {
    pub total_requests: u64,
    pub remote_served: u64,
    pub local_fallbacks: u64,
    pub unmatched_neighbors: u64,
}

#[derive(Default)]
struct Counters {
    total_requests: AtomicU64,
    remote_served: AtomicU64,
    local_fallbacks: AtomicU64,
    unmatched_neighbors: AtomicU64,
}

/// Classifies task descriptions into quadrants.
///
/// Construct one at startup and share it (`Arc<Classifier>`); every method
/// takes `&self` and is safe to call concurrently.
pub struct Classifier {
    config: ClassifierConfig,
    training: Arc<TrainingSet>,
    local: LocalIndex,
    remote: Option<RemoteIndex>,
    counters: Counters,
}

impl Classifier {
    /// Create a new classifier builder.
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::new()
    }

    pub fn new(
        config: ClassifierConfig,
        training: TrainingSet,
        embedder: Embedder,
        remote: Option<RemoteIndex>,
    ) -> Self {
        let local = LocalIndex::new(training.texts(), embedder);
        Self {
            config,
            training: Arc::new(training),
            local,
            remote,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn training(&self) -> &TrainingSet {
        &self.training
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Embed the training set now instead of on the first request.
    pub async fn warm_up(&self) {
        if self.local.ensure_populated().await {
            info!("Local index warmed up with {} examples", self.local.len());
        }
    }

    /// Classify `text`. Never fails.
    pub async fn classify(&self, text: &str) -> Category {
        self.classify_detailed(text).await.category
    }

    /// Classify `text` and report how the decision was reached.
    pub async fn classify_detailed(&self, text: &str) -> Classification {
        self.counters.total_requests.fetch_add(1, Ordering::Relaxed);

        let (results, source) = self.retrieve(text).await;

        let mut tally = VoteTally::new();
        let mut neighbors = Vec::with_capacity(results.len());
        for result in results {
            let label = self.training.label_for(&result.text);
            match label {
                Some(label) => tally.add(label, result.score),
                None => {
                    self.counters
                        .unmatched_neighbors
                        .fetch_add(1, Ordering::Relaxed);
                    debug!("Retrieved text has no training label: {}", result.text);
                }
            }
            neighbors.push(Neighbor {
                text: result.text,
                score: result.score,
                label,
            });
        }

        let (category, confidence) = tally.winner();
        debug!(
            "Classified with {} neighbors from {source:?}: {category:?} ({confidence:.3})",
            neighbors.len()
        );

        Classification {
            category,
            confidence,
            scores: tally.normalized(),
            total_weight: tally.total_weight(),
            neighbors,
            source,
        }
    }

    /// Neighbors from the remote index, or from the local index when the
    /// remote one is absent or unavailable.
    pub async fn retrieve(&self, text: &str) -> (Vec<SimilarityResult>, RetrievalSource) {
        let k = self.config.max_results;
        let min_score = self.config.min_score;

        if let Some(remote) = &self.remote {
            match remote.query(text, k, min_score).await {
                Ok(results) => {
                    self.counters.remote_served.fetch_add(1, Ordering::Relaxed);
                    return (results, RetrievalSource::Remote);
                }
                Err(e) => {
                    warn!("Remote index unavailable ({e}), falling back to local index");
                    self.counters.local_fallbacks.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        (
            self.local.query(text, k, min_score).await,
            RetrievalSource::Local,
        )
    }

    /// Drop cached training embeddings; they are recomputed on next use.
    pub async fn reset_cache(&self) {
        self.local.reset().await;
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.local.stats().await
    }

    pub fn stats(&self) -> ClassifierStats {
        ClassifierStats {
            total_requests: self.counters.total_requests.load(Ordering::Relaxed),
            remote_served: self.counters.remote_served.load(Ordering::Relaxed),
            local_fallbacks: self.counters.local_fallbacks.load(Ordering::Relaxed),
            unmatched_neighbors: self.counters.unmatched_neighbors.load(Ordering::Relaxed),
        }
    }
}

/// Builder for [`Classifier`].
///
/// Defaults to the built-in training set, the hashing embedder and no
/// remote index.
pub struct ClassifierBuilder {
    config: ClassifierConfig,
    training: Option<TrainingSet>,
    embedder: Option<Embedder>,
    remote: Option<RemoteIndex>,
}

impl ClassifierBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: ClassifierConfig::default(),
            training: None,
            embedder: None,
            remote: None,
        }
    }

    pub fn with_config(mut self, config: ClassifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_training(mut self, training: TrainingSet) -> Self {
        self.training = Some(training);
        self
    }

    pub fn with_embedder(mut self, embedder: Embedder) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_remote(mut self, remote: RemoteIndex) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Build the classifier.
    pub fn build(self) -> Classifier {
        let dimension = self.config.dimension;
        let embedder = self
            .embedder
            .unwrap_or_else(|| Embedder::new(Arc::new(HashingProvider::new(dimension)), dimension));
        Classifier::new(
            self.config,
            self.training.unwrap_or_else(TrainingSet::builtin),
            embedder,
            self.remote,
        )
    }
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}
