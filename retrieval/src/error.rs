//! Error types for the classification engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors raised while setting the engine up.
///
/// Classification itself never returns these; they only surface from
/// constructors and loaders.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] taskmatrix_embeddings::EmbeddingError),

    /// Training data could not be read.
    #[error("failed to read training data {}: {source}", path.display())]
    TrainingRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Training data is not a JSON array of records.
    #[error("failed to parse training data: {0}")]
    TrainingParse(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP client could not be built.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Why the remote similarity index could not answer.
///
/// Every variant is recoverable: the classifier falls back to the local
/// index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteUnavailable {
    /// The request exceeded its timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection or transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// Body missing expected fields or otherwise unusable.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for RemoteUnavailable {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// A category id outside the four quadrants.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown category id {0}")]
pub struct UnknownCategory(pub i64);
