//! Configuration for the classification engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use taskmatrix_embeddings::{
    DEFAULT_DIMENSION, DEFAULT_MAX_RESULTS, DEFAULT_MIN_SCORE, Embedder, EmbeddingProvider,
    HashingProvider, HttpProvider,
};
use tracing::info;

use crate::error::{Result, RetrievalError};

/// Multiplier applied to each neighbor's similarity before it votes.
pub const RETRIEVAL_DISCOUNT: f32 = 0.6;

/// Prior weight given to [`crate::Category::DoNow`] before any votes.
pub const BASELINE_WEIGHT: f32 = 1.0;

/// Tunables for retrieval and voting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Dimension every embedding must have.
    pub dimension: usize,

    /// Minimum similarity (exclusive) for a neighbor to count.
    pub min_score: f32,

    /// Maximum number of neighbors per query.
    pub max_results: usize,
}

impl ClassifierConfig {
    /// Set the minimum similarity.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Set the maximum number of neighbors.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            min_score: DEFAULT_MIN_SCORE,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Connection settings for the remote vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the store, e.g. `http://localhost:8000`.
    pub base_url: String,

    /// Collection holding the training examples.
    pub collection: String,

    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            collection: "task_examples".to_string(),
            timeout_ms: 2000,
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// OpenAI-compatible embeddings API.
    Http,
    /// Deterministic feature hashing, no model needed.
    Hashing,
    /// Local ONNX model through fastembed.
    Fastembed,
    /// No embeddings; every request gets the baseline category.
    None,
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Base URL for the `http` provider.
    pub base_url: Option<String>,

    /// Model to use for embeddings.
    pub model: Option<String>,

    /// Environment variable holding the API key, if one is needed.
    pub api_key_env: Option<String>,

    /// Request timeout in milliseconds for the `http` provider.
    pub timeout_ms: u64,

    /// Where the `fastembed` provider keeps downloaded models.
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Hashing,
            base_url: None,
            model: None,
            api_key_env: None,
            timeout_ms: 10_000,
            cache_dir: None,
        }
    }
}

impl EmbeddingConfig {
    /// Build the configured provider, or `None` for [`EmbeddingProviderType::None`].
    pub fn build_provider(&self, dimension: usize) -> Result<Option<Arc<dyn EmbeddingProvider>>> {
        let provider: Arc<dyn EmbeddingProvider> = match self.provider {
            EmbeddingProviderType::None => return Ok(None),
            EmbeddingProviderType::Hashing => Arc::new(HashingProvider::new(dimension)),
            EmbeddingProviderType::Http => {
                let base_url = self.base_url.clone().ok_or_else(|| {
                    RetrievalError::Config(
                        "embedding.base_url is required for the http provider".to_string(),
                    )
                })?;
                let mut provider = HttpProvider::new(base_url)?
                    .with_dimension(dimension)
                    .with_timeout(Duration::from_millis(self.timeout_ms))?;
                if let Some(model) = &self.model {
                    provider = provider.with_model(model);
                }
                if let Some(var) = &self.api_key_env {
                    let key = std::env::var(var).map_err(|_| {
                        RetrievalError::Config(format!("environment variable {var} is not set"))
                    })?;
                    provider = provider.with_api_key(key);
                }
                Arc::new(provider)
            }
            EmbeddingProviderType::Fastembed => self.build_fastembed()?,
        };

        info!(
            "Using {} embedding provider (model {})",
            provider.name(),
            provider.default_model()
        );
        Ok(Some(provider))
    }

    /// Build an [`Embedder`] around the configured provider.
    pub fn build_embedder(&self, dimension: usize) -> Result<Embedder> {
        Ok(match self.build_provider(dimension)? {
            Some(provider) => Embedder::new(provider, dimension),
            None => Embedder::unavailable(dimension),
        })
    }

    #[cfg(feature = "fastembed")]
    fn build_fastembed(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let model = self.model.as_deref().unwrap_or("paraphrase-multilingual-MiniLM-L12-v2");
        let cache_dir = self
            .cache_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".fastembed_cache"));
        Ok(Arc::new(taskmatrix_embeddings::FastEmbedProvider::new(
            model, cache_dir,
        )?))
    }

    #[cfg(not(feature = "fastembed"))]
    fn build_fastembed(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        Err(RetrievalError::Config(
            "built without the `fastembed` feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ClassifierConfig::default();
        assert_eq!(config.dimension, 384);
        assert_eq!(config.min_score, 0.3);
        assert_eq!(config.max_results, 5);

        let remote = RemoteConfig::default();
        assert_eq!(remote.collection, "task_examples");
        assert_eq!(remote.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ClassifierConfig = serde_json::from_str(r#"{"max_results": 3}"#).unwrap();
        assert_eq!(config, ClassifierConfig::default().with_max_results(3));

        let embedding: EmbeddingConfig =
            serde_json::from_str(r#"{"provider": "none"}"#).unwrap();
        assert_eq!(embedding.provider, EmbeddingProviderType::None);
        assert_eq!(embedding.timeout_ms, 10_000);
    }

    #[test]
    fn test_build_none_is_unavailable() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderType::None,
            ..EmbeddingConfig::default()
        };
        let embedder = config.build_embedder(384).unwrap();
        assert!(!embedder.is_available());
    }

    #[test]
    fn test_http_requires_base_url() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderType::Http,
            ..EmbeddingConfig::default()
        };
        assert!(matches!(
            config.build_provider(384),
            Err(RetrievalError::Config(_))
        ));
    }

    #[test]
    fn test_hashing_provider_dimension() {
        let provider = EmbeddingConfig::default().build_provider(64).unwrap().unwrap();
        assert_eq!(provider.name(), "hashing");
        assert_eq!(provider.default_dimension(), 64);
    }
}
