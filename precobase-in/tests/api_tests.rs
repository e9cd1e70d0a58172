//! Integration tests for the precobase-in API endpoints
//!
//! Tests cover:
//! - Health endpoint with module identity and uptime
//! - Pipeline run/reprocess endpoints with input validation
//! - Pipeline statistics
//! - Review queue paging and manual review (404 on unknown ids)
//! - Benchmark endpoint with case filter
//! - Settings endpoint for completion API key rotation

mod helpers;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

use helpers::{
    create_test_pool, pipeline_with, seed_item, seed_taxonomy, ScriptedCompletion,
    UniformCompletion,
};
use precobase_in::classifier::completion::CompletionService;
use precobase_in::{build_router, AppState};

/// Test helper: seeded app over an in-memory pool with a mocked
/// completion service
async fn setup_app(completion: Arc<dyn CompletionService>) -> (axum::Router, SqlitePool) {
    let pool = create_test_pool().await;
    seed_taxonomy(&pool).await;
    let pipeline = Arc::new(pipeline_with(&pool, completion));
    let state = AppState::new(pool.clone(), pipeline);
    (build_router(state), pool)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn health_endpoint_reports_module_identity() {
    let (app, _pool) = setup_app(Arc::new(ScriptedCompletion::new(vec![]))).await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "precobase-in");
    assert!(body["version"].is_string());
    assert!(body["uptime_seconds"].is_number());
    assert_eq!(body["batch_running"], false);
}

#[tokio::test]
async fn pipeline_run_processes_and_reports_outcome() {
    let (app, pool) = setup_app(Arc::new(UniformCompletion::new("CATMAT-44122"))).await;
    seed_item(&pool, "Notebook Dell Inspiron 15", "UN").await;

    let response = app
        .clone()
        .oneshot(post_json("/pipeline/run", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["outcome"]["processed"], 1);
    assert_eq!(body["outcome"]["successful"], 1);
    assert_eq!(body["outcome"]["errors"], 0);

    let response = app.oneshot(get("/pipeline/statistics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_items"], 1);
    assert_eq!(body["processed"], 1);
    assert_eq!(body["pending"], 0);
    assert_eq!(body["by_method"]["EXTERNAL_CLASSIFIER"], 1);
}

#[tokio::test]
async fn pipeline_endpoints_validate_inputs() {
    let (app, _pool) = setup_app(Arc::new(ScriptedCompletion::new(vec![]))).await;

    let response = app
        .clone()
        .oneshot(post_json("/pipeline/run", json!({"confidence_threshold": 1.5})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let response = app
        .clone()
        .oneshot(post_json("/pipeline/run", json!({"batch_size": 0})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json("/pipeline/reprocess", json!({"limit": -5})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn review_queue_and_manual_review_flow() {
    let (app, pool) = setup_app(Arc::new(ScriptedCompletion::single("UNKNOWN"))).await;
    let item = seed_item(&pool, "Papel branco tamanho A4", "PCT").await;

    let response = app
        .clone()
        .oneshot(post_json("/pipeline/run", json!({})))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["outcome"]["low_confidence"], 1);

    let response = app
        .clone()
        .oneshot(get("/review/queue?limit=10&offset=0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 1);
    let entry = &body["entries"][0];
    assert_eq!(entry["original_description"], item.description.as_str());
    assert_eq!(entry["record"]["method"], "EXTERNAL_CLASSIFIER");
    let record_id = entry["record"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/review/{}", record_id),
            json!({
                "category_code": "CATMAT-24328",
                "reviewer_id": "ana.souza",
                "notes": "corrigido manualmente"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "reviewed");
    assert_eq!(body["record"]["confidence"], 1.0);
    assert_eq!(body["record"]["method"], "MANUAL");
    assert_eq!(body["record"]["manually_reviewed"], true);
    assert_eq!(body["record"]["requires_review"], false);
    assert_eq!(body["record"]["reviewed_by"], "ana.souza");

    // Queue is empty once the record is reviewed
    let response = app.oneshot(get("/review/queue")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn manual_review_rejects_unknown_targets() {
    let (app, pool) = setup_app(Arc::new(ScriptedCompletion::single("UNKNOWN"))).await;
    seed_item(&pool, "Caneta esferográfica azul", "UN").await;
    app.clone()
        .oneshot(post_json("/pipeline/run", json!({})))
        .await
        .unwrap();

    // Unknown record id
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/review/{}", uuid::Uuid::new_v4()),
            json!({"reviewer_id": "ana"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    // Known record, unknown category
    let queue = app
        .clone()
        .oneshot(get("/review/queue"))
        .await
        .unwrap();
    let body = extract_json(queue.into_body()).await;
    let record_id = body["entries"][0]["record"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/review/{}", record_id),
            json!({"category_code": "CATMAT-00000", "reviewer_id": "ana"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Blank reviewer id
    let response = app
        .oneshot(post_json(
            &format!("/review/{}", record_id),
            json!({"reviewer_id": "  "}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn benchmark_endpoint_runs_filtered_cases() {
    let (app, _pool) = setup_app(Arc::new(UniformCompletion::new("CATMAT-24328"))).await;

    let response = app
        .oneshot(post_json(
            "/benchmark/run",
            json!({"case_ids": ["papel-a4-resma", "papel-a4-pacote", "papel-a4-caixa"]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["result"]["total_cases"], 3);
    assert_eq!(body["result"]["category_accuracy"], 1.0);
    assert_eq!(body["result"]["group_accuracy"], 1.0);
    assert_eq!(body["summary"]["passed"], true);
    assert!(body["summary"]["report"].as_str().unwrap().contains("PASS"));
}

#[tokio::test]
async fn settings_endpoint_persists_completion_api_key() {
    let (app, pool) = setup_app(Arc::new(UniformCompletion::new("CATMAT-24328"))).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/settings/completion_api_key",
            json!({"api_key": "sk-rotated-123"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert!(body["message"].as_str().unwrap().contains("configured successfully"));

    // Database is authoritative
    let stored = precobase_in::db::settings::get_completion_api_key(&pool)
        .await
        .unwrap();
    assert_eq!(stored, Some("sk-rotated-123".to_string()));

    // Whitespace-only keys are rejected and leave the stored key alone
    let response = app
        .oneshot(post_json("/settings/completion_api_key", json!({"api_key": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stored = precobase_in::db::settings::get_completion_api_key(&pool)
        .await
        .unwrap();
    assert_eq!(stored, Some("sk-rotated-123".to_string()));
}
