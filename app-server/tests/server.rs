use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use taskmatrix_app_server::routes::{ClassifyResponse, HealthResponse};
use taskmatrix_app_server::{AppState, ServerConfig, build_classifier, router};
use taskmatrix_retrieval::{
    CacheState, Category, Classifier, EmbeddingConfig, EmbeddingProviderType, RemoteConfig,
    RetrievalSource,
};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app() -> axum::Router {
    router(AppState::new(Classifier::builder().build()))
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_classify_returns_quadrant() {
    let request = post_json("/classify", r#"{"task": "urgent deadline tomorrow"}"#);
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);

    let response: ClassifyResponse = serde_json::from_value(body).unwrap();
    assert_eq!(response.task, "urgent deadline tomorrow");
    assert_eq!(response.quadrant, 0);
    assert_eq!(response.quadrant_name, "Do Now (Urgent + Important)");
    assert!(response.urgent);
    assert!(response.important);
    assert_eq!(response.source, RetrievalSource::Local);
}

#[tokio::test]
async fn test_facets_match_quadrant() {
    let request = post_json("/classify", r#"{"task": "delete old files"}"#);
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);

    let response: ClassifyResponse = serde_json::from_value(body).unwrap();
    let category = Category::from_id(response.quadrant).unwrap();
    assert_eq!(response.urgent, category.is_urgent());
    assert_eq!(response.important, category.is_important());
    assert_eq!(response.quadrant_name, category.name());
    assert!(response.confidence > 0.0 && response.confidence <= 1.0);
}

#[tokio::test]
async fn test_missing_task_is_bad_request() {
    for body in [r#"{}"#, r#"{"task": ""}"#, r#"{"task": "   "}"#, r#"{"task": null}"#] {
        let (status, json) = send(app(), post_json("/classify", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json, json!({"error": "Missing 'task' field"}));
    }
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (status, json) = send(app(), post_json("/classify", "not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let request = Request::builder()
        .method("POST")
        .uri("/classify")
        .body(Body::from(r#"{"task": "x"}"#))
        .unwrap();
    let (status, _) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_cache_lifecycle() {
    let state = AppState::new(Classifier::builder().build());

    let (_, body) = send(router(state.clone()), get("/health")).await;
    let health: HealthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(
        health,
        HealthResponse {
            status: "ok".to_string(),
            cache_state: CacheState::Empty,
            training_examples: 20,
            remote_enabled: false,
        }
    );

    state.classifier.warm_up().await;
    let (_, body) = send(router(state), get("/health")).await;
    assert_eq!(body["cache_state"], "ready");
}

#[tokio::test]
async fn test_metrics_count_requests() {
    let state = AppState::new(Classifier::builder().build());
    for _ in 0..3 {
        let request = post_json("/classify", r#"{"task": "ignore spam"}"#);
        send(router(state.clone()), request).await;
    }

    let (status, body) = send(router(state), get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_requests"], 3);
    assert_eq!(body["remote_served"], 0);
    assert_eq!(body["cache"]["entries"], 20);
}

#[tokio::test]
async fn test_banner() {
    let (status, body) = send(app(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "taskmatrix");
}

#[tokio::test]
async fn test_no_embeddings_degrades_to_baseline() {
    let config = ServerConfig {
        embedding: EmbeddingConfig {
            provider: EmbeddingProviderType::None,
            ..EmbeddingConfig::default()
        },
        ..ServerConfig::default()
    };
    let classifier = build_classifier(&config).await;

    let (status, body) = send(
        router(AppState::new(classifier)),
        post_json("/classify", r#"{"task": "clean up cache"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quadrant"], 0);
    assert_eq!(body["confidence"], 1.0);
}

#[tokio::test]
async fn test_broken_provider_config_does_not_fail_startup() {
    let config = ServerConfig {
        embedding: EmbeddingConfig {
            provider: EmbeddingProviderType::Http,
            base_url: None,
            ..EmbeddingConfig::default()
        },
        ..ServerConfig::default()
    };
    let classifier = build_classifier(&config).await;
    assert_eq!(classifier.classify("anything").await, Category::DoNow);
}

#[tokio::test]
async fn test_remote_results_are_served() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [["ignore spam", "ignore spam", "ignore spam"]],
            "distances": [[0.0, 0.0, 0.0]]
        })))
        .mount(&server)
        .await;

    let config = ServerConfig {
        remote: Some(RemoteConfig::new(server.uri())),
        ..ServerConfig::default()
    };
    let state = AppState::new(build_classifier(&config).await);

    let (_, body) = send(router(state.clone()), get("/health")).await;
    assert_eq!(body["remote_enabled"], true);

    let request = post_json("/classify", r#"{"task": "spam mail"}"#);
    let (status, body) = send(router(state), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quadrant"], 3);
    assert_eq!(body["source"], "remote");
}

#[tokio::test]
async fn test_training_file_is_loaded() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("training_data.json");
    tokio::fs::write(&path, r#"[{"text": "water the plants", "label": 1}]"#)
        .await
        .unwrap();

    let config = ServerConfig {
        training_data: Some(path),
        ..ServerConfig::default()
    };
    let classifier = build_classifier(&config).await;
    assert_eq!(classifier.training().len(), 1);
    assert_eq!(
        classifier.training().label_for("water the plants"),
        Some(Category::Schedule)
    );
}

#[tokio::test]
async fn test_unparseable_training_file_degrades_to_baseline() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("training_data.json");
    tokio::fs::write(&path, "this is not json").await.unwrap();

    let config = ServerConfig {
        training_data: Some(path),
        ..ServerConfig::default()
    };
    let state = AppState::new(build_classifier(&config).await);
    assert!(state.classifier.training().is_empty());

    let request = post_json("/classify", r#"{"task": "delete old files"}"#);
    let (status, body) = send(router(state), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quadrant"], 0);
    assert_eq!(body["confidence"], 1.0);
}

#[tokio::test]
async fn test_unreadable_training_path_degrades_to_baseline() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = ServerConfig {
        training_data: Some(temp_dir.path().to_path_buf()),
        ..ServerConfig::default()
    };

    let classifier = build_classifier(&config).await;
    assert!(classifier.training().is_empty());
    assert_eq!(classifier.classify("ignore spam").await, Category::DoNow);
}
