//! HTTP front end for the task classifier.

pub mod config;
pub mod routes;

use anyhow::{Context, Result};
use taskmatrix_retrieval::{Classifier, Embedder, RemoteIndex, TrainingSet};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

pub use config::ServerConfig;
pub use routes::{AppState, router};

/// Build the classifier described by `config`.
///
/// Never fails. Training data that cannot be read or parsed leaves an
/// empty training set, a provider that cannot be built degrades to an
/// unavailable embedder, and a remote index that cannot be built is left
/// out. Each case answers every task with the baseline quadrant or the
/// local index instead of stopping the server.
pub async fn build_classifier(config: &ServerConfig) -> Classifier {
    let training = match &config.training_data {
        Some(path) => match TrainingSet::load(path).await {
            Ok(training) => training,
            Err(e) => {
                error!("Failed to load training data: {e}");
                TrainingSet::empty()
            }
        },
        None => {
            info!("No training data configured, using built-in examples");
            TrainingSet::builtin()
        }
    };
    if training.is_empty() {
        warn!("Training set is empty; every task will get the baseline quadrant");
    }

    let dimension = config.classifier.dimension;
    let embedder = match config.embedding.build_embedder(dimension) {
        Ok(embedder) => embedder,
        Err(e) => {
            error!("Failed to initialize embedding provider: {e}");
            Embedder::unavailable(dimension)
        }
    };

    let remote = match &config.remote {
        Some(remote) => match RemoteIndex::new(remote) {
            Ok(index) => {
                info!("Using remote index at {}", index.endpoint());
                Some(index)
            }
            Err(e) => {
                error!("Failed to initialize remote index: {e}");
                None
            }
        },
        None => None,
    };

    Classifier::new(config.classifier.clone(), training, embedder, remote)
}

/// Build the classifier, warm it up and serve until Ctrl-C.
pub async fn run(config: ServerConfig) -> Result<()> {
    let classifier = build_classifier(&config).await;
    classifier.warm_up().await;

    let app = router(AppState::new(classifier));

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!("Listening on {}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
