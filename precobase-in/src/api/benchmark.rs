//! Benchmark API handler
//!
//! POST /benchmark/run

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::benchmark::{self, BenchmarkResult, BenchmarkSummary};
use crate::error::ApiResult;
use crate::AppState;

/// POST /benchmark/run request
#[derive(Debug, Deserialize)]
pub struct RunBenchmarkRequest {
    /// Restrict the run to these case ids (empty or absent = all)
    #[serde(default)]
    pub case_ids: Option<Vec<String>>,
}

/// POST /benchmark/run response
#[derive(Debug, Serialize)]
pub struct RunBenchmarkResponse {
    pub summary: BenchmarkSummary,
    pub result: BenchmarkResult,
}

/// POST /benchmark/run
///
/// Run the built-in labeled dataset through the live classifier and
/// report accuracy against the fixed targets.
pub async fn run_benchmark(
    State(state): State<AppState>,
    Json(request): Json<RunBenchmarkRequest>,
) -> ApiResult<Json<RunBenchmarkResponse>> {
    let cases = benchmark::builtin_cases();

    tracing::info!(
        total_cases = cases.len(),
        filtered = request.case_ids.is_some(),
        "Benchmark run requested"
    );

    let result = benchmark::run(
        state.pipeline.classifier(),
        state.pipeline.extractor(),
        &cases,
        request.case_ids.as_deref(),
    )
    .await;
    let summary = benchmark::summary(&result);

    Ok(Json(RunBenchmarkResponse { summary, result }))
}

/// Build benchmark routes
pub fn benchmark_routes() -> Router<AppState> {
    Router::new().route("/benchmark/run", post(run_benchmark))
}
