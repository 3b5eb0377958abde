//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::logic::features::SchemaMismatch;
use crate::logic::source::SourceError;

pub type AppResult<T> = Result<T, AppError>;

// ============================================================================
// HTTP ERRORS
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    // Validation errors
    ValidationError(String),

    // Database errors
    DatabaseError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

// ============================================================================
// PIPELINE ERRORS
// ============================================================================

/// Failure of one pipeline iteration; never fatal to the loop
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(#[from] SchemaMismatch),

    #[error("detector {detector} failed: {reason}")]
    DetectorFailure { detector: String, reason: String },

    #[error("alert storage failed: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("broadcast to {topic} failed: {reason}")]
    Broadcast { topic: &'static str, reason: String },

    #[error("event source failed: {0}")]
    Source(#[from] SourceError),

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Short machine-readable kind for stats and logs
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SchemaMismatch(_) => "schema_mismatch",
            PipelineError::DetectorFailure { .. } => "detector_failure",
            PipelineError::Storage(_) => "storage",
            PipelineError::Broadcast { .. } => "broadcast",
            PipelineError::Source(_) => "source",
            PipelineError::Serialization(_) => "serialization",
        }
    }
}
