//! Health check endpoint

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::{error::ApiResult, state::ApiState};

/// GET /api/v1/health
pub async fn health_check(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let scheduler = state
        .scheduler
        .state()
        .await
        .map(|s| format!("{s:?}").to_lowercase())
        .unwrap_or_else(|_| "unreachable".to_string());

    Ok(Json(json!({
        "status": "ok",
        "scheduler": scheduler,
    })))
}
