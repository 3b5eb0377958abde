//! Reported IP handlers

use axum::{extract::{State, Query}, Json};
use serde::Deserialize;
use validator::Validate;

use crate::{AppState, AppResult};
use crate::models::{ReportIpRequest, ReportedIp};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize, Default)]
pub struct ReportedQuery {
    pub limit: Option<i64>,
}

/// Record a user report for an IP
pub async fn report_ip(
    State(state): State<AppState>,
    Json(req): Json<ReportIpRequest>,
) -> AppResult<Json<ReportedIp>> {
    req.validate()?;

    let report = ReportedIp::upsert(&state.pool, &req.ip, &req.categories).await?;
    tracing::info!(ip = %report.ip, count = report.report_count, "IP reported");

    Ok(Json(report))
}

/// Most recently reported IPs
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ReportedQuery>,
) -> AppResult<Json<Vec<ReportedIp>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let reports = ReportedIp::list_recent(&state.pool, limit).await?;
    Ok(Json(reports))
}
