//! Client for a remote vector store holding the training examples.
//!
//! Speaks the Chroma query API: the store embeds the query itself and
//! returns documents with distances. Every failure is reported as
//! [`RemoteUnavailable`] so the caller can fall back to the local index.

use serde::{Deserialize, Serialize};
use taskmatrix_embeddings::{SimilarityResult, distance_to_similarity, rank};
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{RemoteUnavailable, Result};

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    collection: &'a str,
    query_texts: [&'a str; 1],
    n_results: usize,
}

/// One result set per query text; both lists are aligned positionally.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    documents: Vec<Vec<Option<String>>>,
    distances: Vec<Vec<Option<f32>>>,
}

/// Remote similarity index.
pub struct RemoteIndex {
    client: reqwest::Client,
    endpoint: String,
    collection: String,
}

impl RemoteIndex {
    /// Create a client; requests are bounded by the configured timeout.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/v1/query", config.base_url.trim_end_matches('/')),
            collection: config.collection.clone(),
        })
    }

    /// Endpoint queried by this client.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Find up to `k` stored examples scoring strictly above `min_score`.
    ///
    /// Distances become similarities via `1 / (1 + d)` and are ranked the
    /// same way as the local index.
    pub async fn query(
        &self,
        text: &str,
        k: usize,
        min_score: f32,
    ) -> std::result::Result<Vec<SimilarityResult>, RemoteUnavailable> {
        let request = QueryRequest {
            collection: &self.collection,
            query_texts: [text],
            n_results: k,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteUnavailable::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let parsed: QueryResponse = serde_json::from_slice(&body)
            .map_err(|e| RemoteUnavailable::Malformed(e.to_string()))?;

        let candidates = to_candidates(parsed)?;
        let results = rank(candidates, k, min_score);
        debug!("Remote index matched {} examples", results.len());
        Ok(results)
    }
}

fn to_candidates(
    response: QueryResponse,
) -> std::result::Result<Vec<SimilarityResult>, RemoteUnavailable> {
    let (Some(documents), Some(distances)) = (
        response.documents.into_iter().next(),
        response.distances.into_iter().next(),
    ) else {
        return Err(RemoteUnavailable::Malformed("no result set".to_string()));
    };

    if documents.len() != distances.len() {
        return Err(RemoteUnavailable::Malformed(format!(
            "{} documents but {} distances",
            documents.len(),
            distances.len()
        )));
    }

    documents
        .into_iter()
        .zip(distances)
        .enumerate()
        .map(|(i, (document, distance))| {
            let document = document
                .ok_or_else(|| RemoteUnavailable::Malformed(format!("document {i} is null")))?;
            let distance = distance
                .filter(|d| d.is_finite() && *d >= 0.0)
                .ok_or_else(|| RemoteUnavailable::Malformed(format!("distance {i} is invalid")))?;
            Ok(SimilarityResult::new(document, distance_to_similarity(distance)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn index_for(server: &MockServer) -> RemoteIndex {
        RemoteIndex::new(&RemoteConfig::new(server.uri()).with_timeout(Duration::from_millis(200)))
            .unwrap()
    }

    async fn respond_with(template: ResponseTemplate) -> (MockServer, RemoteIndex) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/query"))
            .respond_with(template)
            .mount(&server)
            .await;
        let index = index_for(&server).await;
        (server, index)
    }

    #[tokio::test]
    async fn test_query_sends_collection_and_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/query"))
            .and(body_json(serde_json::json!({
                "collection": "task_examples",
                "query_texts": ["server down"],
                "n_results": 5
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "documents": [[]],
                "distances": [[]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = index_for(&server).await.query("server down", 5, 0.3).await;
        assert_eq!(results, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn test_distances_become_ranked_similarities() {
        let (_server, index) = respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({
                "documents": [["far", "exact", "near", "too far"]],
                "distances": [[1.0, 0.0, 0.25, 3.0]]
            }),
        ))
        .await;

        let results = index.query("anything", 5, 0.3).await.unwrap();
        assert_eq!(
            results,
            vec![
                SimilarityResult::new("exact", 1.0),
                SimilarityResult::new("near", 0.8),
                SimilarityResult::new("far", 0.5),
            ]
        );
    }

    #[tokio::test]
    async fn test_results_truncated_to_k() {
        let (_server, index) = respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({
                "documents": [["a", "b", "c"]],
                "distances": [[0.1, 0.2, 0.3]]
            }),
        ))
        .await;

        let results = index.query("anything", 2, 0.3).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let (_server, index) = respond_with(ResponseTemplate::new(503)).await;
        assert_eq!(
            index.query("anything", 5, 0.3).await,
            Err(RemoteUnavailable::Status(503))
        );
    }

    #[tokio::test]
    async fn test_missing_fields_are_malformed() {
        let (_server, index) = respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"documents": [["a"]]})),
        )
        .await;
        assert!(matches!(
            index.query("anything", 5, 0.3).await,
            Err(RemoteUnavailable::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let (_server, index) =
            respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;
        assert!(matches!(
            index.query("anything", 5, 0.3).await,
            Err(RemoteUnavailable::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_misaligned_lists_are_malformed() {
        let (_server, index) = respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({
                "documents": [["a", "b"]],
                "distances": [[0.1]]
            }),
        ))
        .await;
        assert!(matches!(
            index.query("anything", 5, 0.3).await,
            Err(RemoteUnavailable::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_negative_distance_is_malformed() {
        let (_server, index) = respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({
                "documents": [["a"]],
                "distances": [[-0.5]]
            }),
        ))
        .await;
        assert!(matches!(
            index.query("anything", 5, 0.3).await,
            Err(RemoteUnavailable::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let (_server, index) = respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(serde_json::json!({"documents": [[]], "distances": [[]]})),
        )
        .await;
        assert_eq!(
            index.query("anything", 5, 0.3).await,
            Err(RemoteUnavailable::Timeout)
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Grab a free port, then close it so nothing is listening there.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = RemoteConfig::new(format!("http://127.0.0.1:{port}"));
        let index = RemoteIndex::new(&config).unwrap();

        assert!(matches!(
            index.query("anything", 5, 0.3).await,
            Err(RemoteUnavailable::Network(_))
        ));
    }
}
