//! Sample history endpoint

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};
use crate::store::MetricKind;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Query parameters for sample history
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Metric kind: "core_usage", "memory_usage" or "disk_usage"
    metric: String,

    /// Source id: core index, mountpoint, or "memory"
    source: String,

    /// Max results (default: 100, capped at 1000)
    limit: Option<usize>,
}

/// GET /api/v1/history?metric=&source=&limit=
///
/// Up to `limit` most recent samples for the given metric and source,
/// newest first. An unknown (metric, source) pair yields an empty list.
pub async fn sample_history(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Value>> {
    let kind: MetricKind = query
        .metric
        .parse()
        .map_err(ApiError::InvalidRequest)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let samples = state.store.recent(kind, &query.source, limit).await?;

    Ok(Json(json!({
        "metric": kind.to_string(),
        "source": query.source,
        "count": samples.len(),
        "samples": samples,
    })))
}
