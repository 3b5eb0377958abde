//! KPI report handler

use axum::{extract::{State, Query}, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::{AppState, AppResult, AppError};
use crate::logic::kpi::{self, KpiReport, KpiWindow};
use crate::models::Alert;

/// Longest range the dashboard may ask for
const MAX_RANGE_DAYS: u32 = 365;

#[derive(Debug, Deserialize)]
pub struct KpiQuery {
    #[serde(default = "default_range_days")]
    pub range_days: u32,
}

fn default_range_days() -> u32 {
    1
}

/// KPI report over the last `range_days`
pub async fn report(
    State(state): State<AppState>,
    Query(query): Query<KpiQuery>,
) -> AppResult<Json<KpiReport>> {
    if query.range_days > MAX_RANGE_DAYS {
        return Err(AppError::ValidationError(format!(
            "range_days must be at most {}",
            MAX_RANGE_DAYS
        )));
    }

    let now = Utc::now();
    let window = KpiWindow::for_range_days(query.range_days);
    let alerts = Alert::query_range(&state.pool, window.since(now)).await?;

    Ok(Json(kpi::summarize(&alerts, window, now, &state.assets)))
}
