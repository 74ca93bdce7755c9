//! Failure-tolerant front end over an [`EmbeddingProvider`].

use std::sync::Arc;

use tracing::{debug, warn};

use crate::Embedding;
use crate::provider::{EmbeddingProvider, EmbeddingRequest};

/// Converts text to embeddings without ever failing.
///
/// Any provider error, an empty vector, or a vector whose length is not the
/// configured dimension comes back as `None`, meaning "no signal". Callers
/// must never treat it as a zero vector.
#[derive(Clone)]
pub struct Embedder {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    dimension: usize,
}

impl Embedder {
    /// Wrap a provider whose embeddings are expected to have `dimension` entries.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimension: usize) -> Self {
        Self {
            provider: Some(provider),
            dimension,
        }
    }

    /// An embedder with no backing model; every call yields `None`.
    pub fn unavailable(dimension: usize) -> Self {
        Self {
            provider: None,
            dimension,
        }
    }

    /// Whether a provider is attached and reports itself usable.
    pub fn is_available(&self) -> bool {
        self.provider.as_ref().is_some_and(|p| p.is_available())
    }

    /// Expected embedding dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Name of the backing provider, or `"none"`.
    pub fn provider_name(&self) -> &str {
        self.provider.as_ref().map_or("none", |p| p.name())
    }

    /// Embed a single text.
    pub async fn embed(&self, text: &str) -> Option<Embedding> {
        let provider = self.provider.as_ref()?;

        match provider.embed(EmbeddingRequest::new(text)).await {
            Ok(response) => self.validate(response.embedding),
            Err(e) => {
                warn!("Embedding failed via {}: {e}", provider.name());
                None
            }
        }
    }

    /// Embed many texts, keeping positions aligned with the input.
    ///
    /// Tries one batch call first; if the batch fails as a whole, each text
    /// is retried on its own so one bad input cannot blank the rest.
    pub async fn embed_all(&self, texts: &[String]) -> Vec<Option<Embedding>> {
        let Some(provider) = self.provider.as_ref() else {
            return vec![None; texts.len()];
        };
        if texts.is_empty() {
            return Vec::new();
        }

        let requests = texts.iter().map(EmbeddingRequest::new).collect();
        match provider.embed_batch(requests).await {
            Ok(responses) if responses.len() == texts.len() => {
                debug!("Embedded {} texts in one batch", texts.len());
                return responses
                    .into_iter()
                    .map(|r| self.validate(r.embedding))
                    .collect();
            }
            Ok(responses) => warn!(
                "Batch embedding returned {} results for {} texts, retrying individually",
                responses.len(),
                texts.len()
            ),
            Err(e) => warn!("Batch embedding failed, retrying individually: {e}"),
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await);
        }
        embeddings
    }

    fn validate(&self, embedding: Embedding) -> Option<Embedding> {
        if embedding.is_empty() {
            warn!("Provider returned an empty embedding");
            return None;
        }
        if embedding.len() != self.dimension {
            warn!(
                "Discarding embedding with {} dimensions, expected {}",
                embedding.len(),
                self.dimension
            );
            return None;
        }
        Some(embedding)
    }
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("provider", &self.provider_name())
            .field("dimension", &self.dimension)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmbeddingError, Result};
    use crate::provider::{EmbeddingResponse, HashingProvider};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    /// Fails every call, like a model that never loaded.
    struct BrokenProvider;

    #[async_trait]
    impl EmbeddingProvider for BrokenProvider {
        fn name(&self) -> &str {
            "broken"
        }

        fn default_model(&self) -> &str {
            "none"
        }

        fn default_dimension(&self) -> usize {
            4
        }

        async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse> {
            Err(EmbeddingError::Inference("session not loaded".to_string()))
        }

        fn is_available(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_provider_failure_yields_none() {
        let embedder = Embedder::new(Arc::new(BrokenProvider), 4);
        assert_eq!(embedder.embed("anything").await, None);
        assert_eq!(
            embedder.embed_all(&["a".to_string(), "b".to_string()]).await,
            vec![None, None]
        );
    }

    #[tokio::test]
    async fn test_unavailable_embedder() {
        let embedder = Embedder::unavailable(8);
        assert!(!embedder.is_available());
        assert_eq!(embedder.provider_name(), "none");
        assert_eq!(embedder.embed("anything").await, None);
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_discarded() {
        let embedder = Embedder::new(Arc::new(HashingProvider::new(16)), 32);
        assert_eq!(embedder.embed("fix the server").await, None);
    }

    #[tokio::test]
    async fn test_embed_all_keeps_positions() {
        let embedder = Embedder::new(Arc::new(HashingProvider::new(16)), 16);
        let texts = vec!["deploy hotfix".to_string(), "...".to_string(), "call mom".to_string()];

        let embeddings = embedder.embed_all(&texts).await;
        assert_eq!(embeddings.len(), 3);
        assert!(embeddings[0].is_some());
        assert!(embeddings[1].is_none());
        assert!(embeddings[2].is_some());
    }
}
