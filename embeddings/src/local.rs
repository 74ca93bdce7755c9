//! Local ONNX inference through fastembed.
//!
//! fastembed's `embed()` takes `&mut self`, so the model lives behind a
//! mutex and every call runs on the blocking pool.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{InitOptions, TextEmbedding};
use tracing::info;

use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};

/// Embedding provider backed by a locally loaded fastembed model.
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedProvider {
    /// Load `model_name`, downloading it into `cache_dir` on first use.
    pub fn new(model_name: &str, cache_dir: PathBuf) -> Result<Self> {
        let model_enum = parse_model_name(model_name)?;

        std::fs::create_dir_all(&cache_dir).map_err(|e| {
            EmbeddingError::ModelInit(format!("failed to create {}: {e}", cache_dir.display()))
        })?;

        let options = InitOptions::new(model_enum)
            .with_cache_dir(cache_dir)
            .with_show_download_progress(false);

        let mut model =
            TextEmbedding::try_new(options).map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        let dimension = model
            .embed(vec!["probe"], None)
            .map_err(|e| EmbeddingError::ModelInit(format!("failed to probe dimensions: {e}")))?
            .first()
            .map(Vec::len)
            .ok_or_else(|| EmbeddingError::ModelInit("model returned no embedding".to_string()))?;

        info!("Loaded local embedding model {model_name} ({dimension} dimensions)");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: model_name.to_string(),
            dimension,
        })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| EmbeddingError::Inference(format!("model lock poisoned: {e}")))?;
            model
                .embed(texts, None)
                .map_err(|e| EmbeddingError::Inference(e.to_string()))
        })
        .await
        .map_err(|e| EmbeddingError::Inference(format!("inference task failed: {e}")))?
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn name(&self) -> &str {
        "fastembed"
    }

    fn default_model(&self) -> &str {
        &self.model_name
    }

    fn default_dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let embedding = self
            .run(vec![request.text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Inference("no embedding returned".to_string()))?;

        Ok(EmbeddingResponse {
            dimension: embedding.len(),
            embedding,
            model: self.model_name.clone(),
        })
    }

    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let texts = requests.into_iter().map(|r| r.text).collect();
        Ok(self
            .run(texts)
            .await?
            .into_iter()
            .map(|embedding| EmbeddingResponse {
                dimension: embedding.len(),
                embedding,
                model: self.model_name.clone(),
            })
            .collect())
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML12V2),
        "paraphrase-multilingual-minilm-l12-v2" => {
            Ok(fastembed::EmbeddingModel::ParaphraseMLMiniLML12V2)
        }
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        _ => Err(EmbeddingError::ModelInit(format!(
            "unknown model: {name}. Supported models: all-MiniLM-L6-v2, all-MiniLM-L12-v2, \
             paraphrase-multilingual-MiniLM-L12-v2, bge-small-en-v1.5, multilingual-e5-small"
        ))),
    }
}
