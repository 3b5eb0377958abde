//! Alert handlers

use axum::{extract::{State, Query}, Json};
use serde::Deserialize;

use crate::{AppState, AppResult};
use crate::models::Alert;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize, Default)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// Newest stored alerts
pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> AppResult<Json<Vec<Alert>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let alerts = Alert::list_recent(&state.pool, limit).await?;
    Ok(Json(alerts))
}
