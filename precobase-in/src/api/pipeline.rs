//! Normalization pipeline API handlers
//!
//! POST /pipeline/run, POST /pipeline/reprocess, GET /pipeline/statistics

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::pipeline::{
    BatchOptions, BatchOutcome, PipelineStatistics, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_REPROCESS_LIMIT,
};
use crate::AppState;

/// POST /pipeline/run request (all fields optional)
#[derive(Debug, Deserialize)]
pub struct RunBatchRequest {
    pub batch_size: Option<i64>,
    pub confidence_threshold: Option<f64>,
}

/// POST /pipeline/reprocess request (all fields optional)
#[derive(Debug, Deserialize)]
pub struct ReprocessRequest {
    pub confidence_threshold: Option<f64>,
    pub limit: Option<i64>,
}

/// Response for both batch endpoints
#[derive(Debug, Serialize)]
pub struct BatchRunResponse {
    pub status: String,
    pub outcome: BatchOutcome,
}

/// POST /pipeline/run
///
/// Normalize the next batch of unprocessed source items. When a batch
/// is already in flight the outcome comes back all-zero.
pub async fn run_batch(
    State(state): State<AppState>,
    Json(request): Json<RunBatchRequest>,
) -> ApiResult<Json<BatchRunResponse>> {
    tracing::info!(?request, "Batch run requested");

    let mut options = BatchOptions::default();
    if let Some(batch_size) = request.batch_size {
        if batch_size <= 0 {
            return Err(ApiError::BadRequest(format!(
                "batch_size must be positive: {}",
                batch_size
            )));
        }
        options.batch_size = batch_size;
    }
    if let Some(threshold) = request.confidence_threshold {
        validate_threshold(threshold)?;
        options.confidence_threshold = threshold;
    }

    let outcome = state.pipeline.run_batch(&options).await?;

    Ok(Json(BatchRunResponse {
        status: "completed".to_string(),
        outcome,
    }))
}

/// POST /pipeline/reprocess
///
/// Delete low-confidence records and run them through classification
/// again. Shares the single-flight guard with /pipeline/run.
pub async fn reprocess(
    State(state): State<AppState>,
    Json(request): Json<ReprocessRequest>,
) -> ApiResult<Json<BatchRunResponse>> {
    tracing::info!(?request, "Reprocess requested");

    let threshold = match request.confidence_threshold {
        Some(threshold) => {
            validate_threshold(threshold)?;
            threshold
        }
        None => DEFAULT_CONFIDENCE_THRESHOLD,
    };
    let limit = match request.limit {
        Some(limit) if limit <= 0 => {
            return Err(ApiError::BadRequest(format!(
                "limit must be positive: {}",
                limit
            )));
        }
        Some(limit) => limit,
        None => DEFAULT_REPROCESS_LIMIT,
    };

    let outcome = state
        .pipeline
        .reprocess_low_confidence(threshold, limit)
        .await?;

    Ok(Json(BatchRunResponse {
        status: "completed".to_string(),
        outcome,
    }))
}

/// GET /pipeline/statistics
///
/// Aggregate counts over source items and normalized records.
pub async fn get_statistics(
    State(state): State<AppState>,
) -> ApiResult<Json<PipelineStatistics>> {
    let statistics = state.pipeline.statistics().await?;
    Ok(Json(statistics))
}

fn validate_threshold(threshold: f64) -> Result<(), ApiError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ApiError::BadRequest(format!(
            "confidence_threshold must be within [0, 1]: {}",
            threshold
        )));
    }
    Ok(())
}

/// Build pipeline routes
pub fn pipeline_routes() -> Router<AppState> {
    Router::new()
        .route("/pipeline/run", post(run_batch))
        .route("/pipeline/reprocess", post(reprocess))
        .route("/pipeline/statistics", get(get_statistics))
}
