//! Server configuration file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use taskmatrix_retrieval::{ClassifierConfig, EmbeddingConfig, RemoteConfig};

/// Top-level TOML configuration. Every section is optional.
///
/// ```toml
/// bind = "127.0.0.1:8080"
/// training_data = "training_data.json"
///
/// [classifier]
/// max_results = 5
///
/// [embedding]
/// provider = "http"
/// base_url = "http://localhost:11434/v1"
///
/// [remote]
/// base_url = "http://localhost:8000"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: SocketAddr,

    /// JSON file with labeled examples. Falls back to the built-in set
    /// when unset.
    pub training_data: Option<PathBuf>,

    pub classifier: ClassifierConfig,

    pub embedding: EmbeddingConfig,

    /// Remote vector store. Only the local index is used when absent.
    pub remote: Option<RemoteConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            training_data: None,
            classifier: ClassifierConfig::default(),
            embedding: EmbeddingConfig::default(),
            remote: None,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid server configuration")
    }

    /// Read and parse a TOML file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
    }
}
