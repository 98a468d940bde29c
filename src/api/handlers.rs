//! Request handlers for the revenue predictor API

use super::AppState;
use crate::dataset::CsvTable;
use crate::eda::{self, EdaReport};
use crate::errors::{Error, ProcessingContext, Result};
use crate::metrics::MetricsSnapshot;
use crate::types::{CampaignRecord, ManualInput, PredictionResult};
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Multipart field carrying the uploaded CSV
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub ad_group_classes: usize,
    pub month_classes: usize,
    pub uptime_secs: u64,
}

/// Count the request and, on failure, the error.
fn observe<T>(state: &AppState, endpoint: &str, started: Instant, result: &Result<T>) {
    state.metrics.record_request(endpoint, started.elapsed());
    if let Err(e) = result {
        state.metrics.record_error();
        warn!(endpoint, status = %e.status_code(), error = %e, "Request failed");
    }
}

fn record_predictions(state: &AppState, results: &[PredictionResult]) {
    let degraded = results.iter().filter(|r| r.is_degraded()).count();
    state.metrics.record_predictions(results.len(), degraded);
}

/// Pull the bytes of the `file` field out of a multipart body.
async fn read_upload(multipart: std::result::Result<Multipart, MultipartRejection>) -> Result<Bytes> {
    let mut multipart = multipart.map_err(|e| Error::validation(UPLOAD_FIELD, e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::validation(UPLOAD_FIELD, format!("Failed to parse multipart data: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::validation(UPLOAD_FIELD, format!("Failed to read upload: {e}")))?;
        debug!(file_name = ?file_name, size = bytes.len(), "Received upload");
        return Ok(bytes);
    }

    Err(Error::validation(UPLOAD_FIELD, "multipart field 'file' is required"))
}

/// Run CPU-bound work off the async executor.
async fn blocking<T, F>(context: &'static str, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.processing(context)?
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the Multi-Touch Attribution (MTA) Revenue Predictor API!"
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let encoders = state.service.encoders();
    Json(HealthResponse {
        status: "ok",
        model: state.service.model_name().to_string(),
        ad_group_classes: encoders.ad_group.len(),
        month_classes: encoders.month.len(),
        uptime_secs: state.metrics.uptime().as_secs(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// `POST /eda`: summary statistics of an uploaded CSV
pub async fn eda(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<EdaReport>> {
    let started = Instant::now();
    let result = async {
        let bytes = read_upload(multipart).await?;
        blocking("file", move || {
            let table = CsvTable::from_bytes(&bytes)?;
            Ok(eda::summarize(&table))
        })
        .await
    }
    .await;

    observe(&state, "eda", started, &result);
    if let Ok(report) = &result {
        info!(rows = report.shape[0], columns = report.shape[1], "EDA report generated");
    }
    result.map(Json)
}

/// `POST /predict_from_csv`: score every row of an uploaded CSV
pub async fn predict_from_csv(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<PredictionResult>>> {
    let started = Instant::now();
    let result = async {
        let bytes = read_upload(multipart).await?;
        let service = state.service.clone();
        blocking("file", move || service.predict_csv(&bytes)).await
    }
    .await;

    observe(&state, "predict_from_csv", started, &result);
    if let Ok(results) = &result {
        record_predictions(&state, results);
        info!(
            rows = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scored CSV upload"
        );
    }
    result.map(Json)
}

/// `POST /predict_from_manual`: score one JSON campaign record
pub async fn predict_from_manual(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResult>> {
    let started = Instant::now();
    let result = async {
        let Json(value) = body.map_err(|e| Error::validation("body", e.body_text()))?;
        let record = CampaignRecord::from(ManualInput::from_json(value)?);
        let service = state.service.clone();
        blocking("record", move || service.predict_one(&record)).await
    }
    .await;

    observe(&state, "predict_from_manual", started, &result);
    if let Ok(prediction) = &result {
        record_predictions(&state, std::slice::from_ref(prediction));
        debug!(
            ad_group = %prediction.ad_group,
            month = %prediction.month,
            predicted_revenue = prediction.predicted_revenue,
            "Scored manual record"
        );
    }
    result.map(Json)
}
