// HTTP request handlers - read-only views over the latest snapshot
use crate::domain::metric::MetricKind;
use crate::domain::series::SeriesPoint;
use crate::domain::snapshot::{ClassifiedValue, Snapshot};
use crate::domain::threshold::ThresholdRange;
use crate::infrastructure::chunked_json::snapshot_stream_response;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub metric: String,
    pub capacity: usize,
    pub range: Option<ThresholdRange>,
    pub points: Vec<SeriesPoint>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Latest published snapshot
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    let snapshot = state.ingestion_service.latest_snapshot();
    Json(snapshot.as_ref().clone())
}

/// Latest classified value of one metric; 404 until it has been reported
pub async fn get_metric(
    Path(metric): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClassifiedValue>, StatusCode> {
    let snapshot = state.ingestion_service.latest_snapshot();
    snapshot
        .entry(&MetricKind::from_name(&metric))
        .classified()
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Rolling window for one charted metric
pub async fn get_series(
    Path(metric): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SeriesResponse>, StatusCode> {
    let kind = MetricKind::from_name(&metric);
    let service = &state.ingestion_service;

    let points = service.series(&kind).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(SeriesResponse {
        metric: kind.name().to_string(),
        capacity: service.window_capacity(),
        range: service.classifier().range_for(&kind).copied(),
        points,
    }))
}

/// Configured optimal ranges, keyed by metric name
pub async fn get_thresholds(
    State(state): State<Arc<AppState>>,
) -> Json<BTreeMap<String, ThresholdRange>> {
    let ranges = state
        .ingestion_service
        .classifier()
        .ranges()
        .iter()
        .map(|(metric, range)| (metric.name().to_string(), *range))
        .collect();
    Json(ranges)
}

/// Push every new snapshot as a newline-delimited JSON stream
pub async fn stream_snapshots(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rx = state.ingestion_service.subscribe();
    match snapshot_stream_response(rx, state.shutdown.clone(), state.stream_keep_alive) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
