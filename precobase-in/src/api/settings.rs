//! Settings API endpoint
//!
//! POST /settings/completion_api_key persists a new completion-service
//! key: the settings table is authoritative, with a best-effort TOML
//! write-back so the key survives a wiped database. The running
//! completion client is built at startup, so a rotated key takes effect
//! at the next restart.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::{config, db, AppState};

/// Request payload for setting the completion API key
#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

/// Response payload for API key configuration
#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    pub message: String,
}

/// POST /settings/completion_api_key handler
///
/// **Request:** `{"api_key": "sk-..."}`
///
/// **Behavior:**
/// 1. Validate key (non-empty, non-whitespace)
/// 2. Write to database (authoritative)
/// 3. Sync to TOML (best-effort backup)
///
/// TOML write failures log warnings but do not fail the request.
pub async fn set_completion_api_key(
    State(state): State<AppState>,
    Json(payload): Json<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    if !config::is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }

    // Write to database (authoritative)
    db::settings::set_completion_api_key(&state.db, payload.api_key.clone())
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save API key to database: {}", e)))?;

    info!("Completion API key configured via settings API");

    // Sync to TOML (best-effort backup)
    match precobase_common::config::config_file_path("precobase-in") {
        Some(toml_path) => {
            let mut settings = HashMap::new();
            settings.insert("completion_api_key".to_string(), payload.api_key);
            match config::sync_settings_to_toml(settings, &toml_path).await {
                Ok(()) => {
                    info!("API key synced to TOML: {}", toml_path.display());
                }
                Err(e) => {
                    warn!("TOML sync failed (database write succeeded): {}", e);
                }
            }
        }
        None => {
            warn!("No config directory on this platform; skipping TOML sync");
        }
    }

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "Completion API key configured successfully; takes effect at next startup"
            .to_string(),
    }))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/settings/completion_api_key", post(set_completion_api_key))
}
