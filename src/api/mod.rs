//! HTTP surface: upload-driven EDA and revenue prediction endpoints

pub mod handlers;

use crate::metrics::ServiceMetrics;
use crate::service::PredictionService;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: PredictionService,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(service: PredictionService, metrics: Arc<ServiceMetrics>) -> Self {
        Self { service, metrics }
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/eda", post(handlers::eda))
        .route("/predict_from_csv", post(handlers::predict_from_csv))
        .route("/predict_from_manual", post(handlers::predict_from_manual))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
