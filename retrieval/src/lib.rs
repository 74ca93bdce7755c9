//! # Task Classification Engine
//!
//! Sorts free-text task descriptions into the four urgency/importance
//! quadrants by retrieving similar labeled examples and letting them vote.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Classifier                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │   ┌──────────────┐   on any failure   ┌──────────────┐      │
//! │   │    Remote    │ ─────────────────▶ │    Local     │      │
//! │   │    Index     │                    │    Index     │      │
//! │   └──────────────┘                    └──────────────┘      │
//! │          │                                   │              │
//! │          └─────────────────┬─────────────────┘              │
//! │                            ▼                                │
//! │                    ┌──────────────┐    ┌──────────────┐     │
//! │                    │   Weighted   │◀───│   Training   │     │
//! │                    │     Vote     │    │     Set      │     │
//! │                    └──────────────┘    └──────────────┘     │
//! │                            │                                │
//! │                            ▼                                │
//! │                        Category                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use taskmatrix_retrieval::{Classifier, TrainingSet};
//!
//! let classifier = Classifier::builder()
//!     .with_training(TrainingSet::load("training_data.json").await?)
//!     .build();
//!
//! let category = classifier.classify("fix broken production server").await;
//! println!("{category} (urgent: {})", category.is_urgent());
//! ```

pub mod category;
pub mod classifier;
pub mod config;
pub mod error;
pub mod remote;
pub mod training;

pub use category::{Category, CategoryInfo, UNKNOWN_NAME, resolve};
pub use classifier::{
    Classification, Classifier, ClassifierBuilder, ClassifierStats, Neighbor, RetrievalSource,
    VoteTally,
};
pub use config::{
    BASELINE_WEIGHT, ClassifierConfig, EmbeddingConfig, EmbeddingProviderType, RETRIEVAL_DISCOUNT,
    RemoteConfig,
};
pub use error::{RemoteUnavailable, Result, RetrievalError, UnknownCategory};
pub use remote::RemoteIndex;
pub use training::{TrainingExample, TrainingSet};

// Re-export from dependencies for convenience
pub use taskmatrix_embeddings::{CacheState, CacheStats, Embedder, EmbeddingProvider};
