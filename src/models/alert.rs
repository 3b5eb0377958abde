//! Alert model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, SqlitePool};

use crate::logic::ensemble::Verdict;
use crate::logic::source::TrafficEvent;

/// Persisted projection of a malicious event and its verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    /// Reasons joined for display
    pub reason: String,
    pub reasons: Vec<String>,
    pub risk_score: u8,
    pub playbook: Vec<String>,
    /// Unscaled feature values in layout order
    pub features: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub reasons: Vec<String>,
    pub risk_score: u8,
    pub playbook: Vec<String>,
    pub features: Vec<f32>,
}

impl NewAlert {
    pub fn from_event(event: &TrafficEvent, verdict: &Verdict) -> Self {
        Self {
            timestamp: event.timestamp,
            ip: event.source_ip.clone(),
            reasons: verdict.reasons.clone(),
            risk_score: verdict.risk_score,
            playbook: verdict.playbook.clone(),
            features: event.features.values.clone(),
        }
    }
}

#[derive(FromRow)]
struct AlertRow {
    id: i64,
    timestamp_ms: i64,
    ip: String,
    reason: String,
    reasons: Json<Vec<String>>,
    risk_score: i64,
    playbook: Json<Vec<String>>,
    features: Json<Vec<f32>>,
}

impl From<AlertRow> for Alert {
    fn from(row: AlertRow) -> Self {
        Self {
            id: row.id,
            timestamp: DateTime::from_timestamp_millis(row.timestamp_ms).unwrap_or_default(),
            ip: row.ip,
            reason: row.reason,
            reasons: row.reasons.0,
            risk_score: row.risk_score.clamp(0, 100) as u8,
            playbook: row.playbook.0,
            features: row.features.0,
        }
    }
}

impl Alert {
    /// Append an alert; errors propagate so a lost alert is observable
    pub async fn insert(pool: &SqlitePool, alert: &NewAlert) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO alerts (timestamp_ms, ip, reason, reasons, risk_score, playbook, features)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(alert.timestamp.timestamp_millis())
        .bind(&alert.ip)
        .bind(alert.reasons.join(crate::logic::ensemble::REASON_SEPARATOR))
        .bind(Json(&alert.reasons))
        .bind(i64::from(alert.risk_score))
        .bind(Json(&alert.playbook))
        .bind(Json(&alert.features))
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Alerts with `timestamp >= since`, oldest first
    pub async fn query_range(pool: &SqlitePool, since: DateTime<Utc>) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AlertRow>(
            "SELECT * FROM alerts WHERE timestamp_ms >= ? ORDER BY timestamp_ms, id"
        )
        .bind(since.timestamp_millis())
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Alert::from).collect())
    }

    /// Newest alerts first
    pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AlertRow>(
            "SELECT * FROM alerts ORDER BY timestamp_ms DESC, id DESC LIMIT ?"
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Alert::from).collect())
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM alerts")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
