//! # Embeddings
//!
//! This crate turns task descriptions into dense vectors and finds the
//! training examples closest to a query.
//!
//! ## Features
//!
//! - **Embedding Generation**: HTTP (OpenAI-compatible), hashing, or local
//!   ONNX inference (`fastembed` feature)
//! - **Graceful Degradation**: [`Embedder`] never fails; it yields `None`
//! - **Similarity Search**: cosine similarity with strict thresholding and
//!   stable ranking
//! - **Caching**: training embeddings computed once, on first use
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedder ──► EmbeddingCache              │
//! │       │                   │              │                      │
//! │       ▼                   ▼              ▼                      │
//! │  Http/Hashing/Local   LocalIndex ──► rank()                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod embedder;
pub mod error;
pub mod index;
#[cfg(feature = "fastembed")]
pub mod local;
pub mod provider;
pub mod similarity;

pub use cache::{CacheState, CacheStats, EmbeddingCache};
pub use embedder::Embedder;
pub use error::{EmbeddingError, Result};
pub use index::{DEFAULT_MAX_RESULTS, DEFAULT_MIN_SCORE, LocalIndex};
#[cfg(feature = "fastembed")]
pub use local::FastEmbedProvider;
pub use provider::{
    EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, HashingProvider, HttpProvider,
};
pub use similarity::{SimilarityResult, cosine_similarity, distance_to_similarity, rank};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of embeddings (MiniLM-L12 family).
pub const DEFAULT_DIMENSION: usize = 384;
