//! HTTP handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use taskmatrix_retrieval::{
    CacheState, CacheStats, CategoryInfo, Classifier, ClassifierStats, RetrievalSource,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::debug;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<Classifier>,
}

impl AppState {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier: Arc::new(classifier),
        }
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/classify", post(classify))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        )
        .with_state(state)
}

/// Error body returned to clients.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    pub task: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ClassifyResponse {
    pub task: String,
    pub urgent: bool,
    pub important: bool,
    pub quadrant: i64,
    pub quadrant_name: String,
    pub confidence: f32,
    pub source: RetrievalSource,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub cache_state: CacheState,
    pub training_examples: usize,
    pub remote_enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub classifier: ClassifierStats,
    pub cache: CacheStats,
}

async fn banner() -> Json<serde_json::Value> {
    Json(json!({
        "service": "taskmatrix",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn classify(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, HttpError> {
    let Json(request) = payload.map_err(|e| HttpError::bad_request(e.body_text()))?;

    let task = request
        .task
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| HttpError::bad_request("Missing 'task' field"))?;

    let classification = state.classifier.classify_detailed(&task).await;
    let info = CategoryInfo::from(classification.category);
    debug!("Classified task as {}", info.name);

    Ok(Json(ClassifyResponse {
        task,
        urgent: info.urgent,
        important: info.important,
        quadrant: info.id,
        quadrant_name: info.name.to_string(),
        confidence: classification.confidence,
        source: classification.source,
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let classifier = &state.classifier;
    Json(HealthResponse {
        status: "ok".to_string(),
        cache_state: classifier.cache_stats().await.state,
        training_examples: classifier.training().len(),
        remote_enabled: classifier.has_remote(),
    })
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        classifier: state.classifier.stats(),
        cache: state.classifier.cache_stats().await,
    })
}
