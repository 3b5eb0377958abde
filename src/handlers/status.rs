//! Pipeline status handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppState, AppResult};
use crate::logic::ensemble::DetectorInfo;
use crate::logic::features::LayoutInfo;
use crate::logic::pipeline::PipelineStatsSnapshot;
use crate::models::Alert;

#[derive(Debug, Serialize)]
pub struct SubscriberCounts {
    pub raw: usize,
    pub processed: usize,
}

#[derive(Debug, Serialize)]
pub struct PipelineStatus {
    pub stats: PipelineStatsSnapshot,
    /// Alerts in the store, including those from earlier runs
    pub stored_alerts: i64,
    pub detectors: Vec<DetectorInfo>,
    pub layout_version: u8,
    pub layout_hash: String,
    pub feature_count: usize,
    pub subscribers: SubscriberCounts,
}

pub async fn pipeline(State(state): State<AppState>) -> AppResult<Json<PipelineStatus>> {
    let layout = LayoutInfo::current();
    let stored_alerts = Alert::count(&state.pool).await?;

    Ok(Json(PipelineStatus {
        stats: state.stats.snapshot(),
        stored_alerts,
        detectors: state.ensemble.panel().describe(),
        layout_version: layout.version,
        layout_hash: format!("{:08x}", layout.hash),
        feature_count: layout.feature_count,
        subscribers: SubscriberCounts {
            raw: state.raw_hub.subscriber_count(),
            processed: state.processed_hub.subscriber_count(),
        },
    }))
}
