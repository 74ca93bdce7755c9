//! Similarity computation and ranking for embeddings.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical direction
/// - 0.0 means orthogonal vectors (or a zero-norm input)
/// - -1.0 means opposite vectors
///
/// Embeddings of different lengths come from different models and are an
/// error, not a zero score.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

/// Convert a vector-store distance into a similarity score in `(0, 1]`.
///
/// Strictly decreasing in `distance` for `distance >= 0`.
pub fn distance_to_similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

/// Normalize an embedding to unit length.
pub fn normalize(embedding: &mut [f32]) {
    let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in embedding.iter_mut() {
            *x /= magnitude;
        }
    }
}

/// A similarity search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Text of the matched example.
    pub text: String,

    /// Similarity score.
    pub score: f32,
}

impl SimilarityResult {
    /// Create a new similarity result.
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score,
        }
    }
}

/// Threshold, order and truncate candidate results.
///
/// Keeps only scores strictly above `min_score`, sorts by score descending
/// and keeps the first `k`. The sort is stable, so equal scores stay in
/// insertion order. Both the local and the remote index rank through here.
pub fn rank(candidates: Vec<SimilarityResult>, k: usize, min_score: f32) -> Vec<SimilarityResult> {
    let mut results: Vec<SimilarityResult> = candidates
        .into_iter()
        .filter(|r| r.score > min_score)
        .collect();

    results.sort_by(|a, b| OrderedFloat(b.score).cmp(&OrderedFloat(a.score)));
    results.truncate(k);
    results
}
