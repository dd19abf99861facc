//! HTTP surface for throughput prediction.

pub mod config;
pub mod error;
pub mod model;
pub mod routes;
pub mod types;

use axum::routing::{get, post};
use axum::Router;
use qos_pipeline::ModelArtifact;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared by every handler; the artifact is never mutated after startup.
#[derive(Clone, Default)]
pub struct AppState {
    pub artifact: Option<Arc<ModelArtifact>>,
    pub log_predictions: bool,
}

impl AppState {
    pub fn new(artifact: Option<Arc<ModelArtifact>>) -> Self {
        Self {
            artifact,
            log_predictions: false,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(routes::predict))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
