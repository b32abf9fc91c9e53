//! Latest-snapshot endpoint

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::{error::ApiResult, state::ApiState};

/// GET /api/v1/snapshot
///
/// The most recently completed snapshot, or `null` if no successful tick has
/// occurred yet. "No data yet" is a legitimate result, not an error. This
/// never triggers a live scan; it serves the cached reference immediately.
pub async fn latest_snapshot(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let snapshot = state.cache.latest().await;

    Ok(Json(json!({
        "snapshot": snapshot.as_deref(),
    })))
}
