//! Lazily populated embedding cache for the training examples.
//!
//! The cache moves through [`CacheState::Empty`] → [`CacheState::Populating`]
//! → [`CacheState::Ready`] exactly once per lifetime (or per [`reset`]).
//! Population is guarded by a mutex that is held only while populating;
//! queries take a cheap `Arc` snapshot and never contend with each other.
//!
//! [`reset`]: EmbeddingCache::reset

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::Embedding;
use crate::embedder::Embedder;

/// Lifecycle of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// Nothing embedded yet.
    Empty,
    /// One caller is embedding the training texts.
    Populating,
    /// Embeddings are available to queries.
    Ready,
}

impl CacheState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Populating,
            2 => Self::Ready,
            _ => Self::Empty,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Populating => 1,
            Self::Ready => 2,
        }
    }
}

/// Embeddings are stored positionally; `None` marks a text that failed to embed.
pub type CachedEmbeddings = Arc<Vec<Option<Embedding>>>;

/// Position-indexed embeddings of a fixed list of texts.
pub struct EmbeddingCache {
    state: AtomicU8,
    populate_lock: Mutex<()>,
    entries: RwLock<CachedEmbeddings>,
}

impl EmbeddingCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(CacheState::Empty.as_u8()),
            populate_lock: Mutex::new(()),
            entries: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CacheState {
        CacheState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: CacheState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Embed `texts` unless that already happened.
    ///
    /// Safe to call concurrently: the first caller populates, everyone who
    /// arrives meanwhile waits on the lock and then sees `Ready`. Returns
    /// `true` if this call did the population.
    pub async fn ensure_populated(&self, texts: &[String], embedder: &Embedder) -> bool {
        if self.state() == CacheState::Ready {
            return false;
        }

        let _guard = self.populate_lock.lock().await;
        // Re-check under the lock: another caller may have finished while we waited.
        if self.state() == CacheState::Ready {
            return false;
        }

        self.set_state(CacheState::Populating);
        let started = Instant::now();

        let embeddings = embedder.embed_all(texts).await;
        let failed = embeddings.iter().filter(|e| e.is_none()).count();
        if failed > 0 {
            warn!(
                "{failed} of {} training examples could not be embedded and will be ignored",
                texts.len()
            );
        }

        *self.entries.write().await = Arc::new(embeddings);
        self.set_state(CacheState::Ready);

        info!(
            "Embedded {} training examples in {}ms",
            texts.len() - failed,
            started.elapsed().as_millis()
        );
        true
    }

    /// Snapshot of the cached embeddings.
    pub async fn snapshot(&self) -> CachedEmbeddings {
        Arc::clone(&*self.entries.read().await)
    }

    /// Drop all embeddings and return to `Empty`.
    pub async fn reset(&self) {
        let _guard = self.populate_lock.lock().await;
        *self.entries.write().await = Arc::new(Vec::new());
        self.set_state(CacheState::Empty);
        debug!("Reset embedding cache");
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let entries = self.snapshot().await;
        let embedded = entries.iter().filter(|e| e.is_some()).count();
        CacheStats {
            state: self.state(),
            entries: entries.len(),
            embedded,
            failed: entries.len() - embedded,
        }
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the embedding cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lifecycle state.
    pub state: CacheState,

    /// Number of slots (one per training example once populated).
    pub entries: usize,

    /// Slots holding an embedding.
    pub embedded: usize,

    /// Slots whose text failed to embed.
    pub failed: usize,
}
