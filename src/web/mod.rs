//! HTTP surface: the demo page plus JSON/CSV endpoints for the same flow.

mod error;
mod handlers;
pub mod render;

pub use error::{AppError, AppResult};
pub use handlers::{HealthResponse, PredictionsResponse};

use crate::config::{DemoConfig, RenderConfig};
use crate::model::Classifier;
use crate::scoring::ScoringPipeline;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state. The classifier inside is created once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: ScoringPipeline,
    pub render: RenderConfig,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(classifier: Arc<dyn Classifier>, config: &DemoConfig) -> Self {
        Self {
            pipeline: ScoringPipeline::new(classifier),
            render: config.render.clone(),
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(handlers::index).post(handlers::upload_page))
        .route("/health", get(handlers::health))
        .route("/api/v1/predictions", post(handlers::predictions_json))
        .route("/api/v1/predictions/csv", post(handlers::predictions_csv))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
