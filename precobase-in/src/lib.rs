//! precobase-in library interface
//!
//! Exposes the normalization pipeline, classifier and HTTP API for
//! integration testing.

pub mod api;
pub mod benchmark;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod lexicon;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod similarity;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::pipeline::NormalizationPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Normalization pipeline (owns the classifier and the batch guard)
    pub pipeline: Arc<NormalizationPipeline>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, pipeline: Arc<NormalizationPipeline>) -> Self {
        Self {
            db,
            pipeline,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::pipeline_routes())
        .merge(api::review_routes())
        .merge(api::benchmark_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .with_state(state)
}
