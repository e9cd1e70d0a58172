//! Human review API handlers
//!
//! GET /review/queue, POST /review/:record_id

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::records::ReviewQueueEntry;
use crate::error::{ApiError, ApiResult};
use crate::models::NormalizedRecord;
use crate::pipeline::ReviewChanges;
use crate::AppState;

const MAX_QUEUE_LIMIT: i64 = 500;

/// Query parameters for the review queue
#[derive(Debug, Deserialize)]
pub struct ReviewQueueQuery {
    /// Maximum entries to return
    #[serde(default = "default_limit")]
    pub limit: i64,

    /// Entries to skip (for paging)
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// GET /review/queue response
#[derive(Debug, Serialize)]
pub struct ReviewQueueResponse {
    pub count: usize,
    pub entries: Vec<ReviewQueueEntry>,
}

/// POST /review/:record_id request
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// Replacement category code (must exist)
    pub category_code: Option<String>,
    /// Replacement description (normalized before storage)
    pub description: Option<String>,
    pub reviewer_id: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// POST /review/:record_id response
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub status: String,
    pub record: NormalizedRecord,
}

/// GET /review/queue
///
/// Records flagged for review, worst confidence first.
pub async fn get_review_queue(
    State(state): State<AppState>,
    Query(query): Query<ReviewQueueQuery>,
) -> ApiResult<Json<ReviewQueueResponse>> {
    let limit = query.limit.clamp(1, MAX_QUEUE_LIMIT);
    let offset = query.offset.max(0);

    let entries = state.pipeline.list_for_review(limit, offset).await?;

    tracing::debug!(count = entries.len(), limit, offset, "Review queue query");

    Ok(Json(ReviewQueueResponse {
        count: entries.len(),
        entries,
    }))
}

/// POST /review/:record_id
///
/// Apply a human review decision to one record. Returns 404 when the
/// record or the requested category does not exist.
pub async fn review_record(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<Json<ReviewResponse>> {
    if request.reviewer_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "reviewer_id must not be empty".to_string(),
        ));
    }

    let changes = ReviewChanges {
        category_code: request.category_code,
        description: request.description,
    };

    let record = state
        .pipeline
        .review_manually(record_id, &changes, &request.reviewer_id, request.notes)
        .await?;

    tracing::info!(
        record_id = %record_id,
        reviewer = %request.reviewer_id,
        "Record manually reviewed"
    );

    Ok(Json(ReviewResponse {
        status: "reviewed".to_string(),
        record,
    }))
}

/// Build review routes
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/review/queue", get(get_review_queue))
        .route("/review/:record_id", post(review_record))
}
