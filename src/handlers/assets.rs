//! Asset inventory handler

use std::collections::BTreeMap;

use axum::{extract::State, Json};

use crate::AppState;
use crate::logic::assets::Asset;

/// Every known asset keyed by IP
pub async fn list(State(state): State<AppState>) -> Json<BTreeMap<String, Asset>> {
    Json(state.assets.snapshot())
}
