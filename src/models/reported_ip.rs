//! Reported IP model

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedIp {
    pub id: i64,
    pub ip: String,
    pub report_count: i64,
    pub last_reported_at: DateTime<Utc>,
    pub status: String,
    /// Union of every category ever reported, sorted
    pub categories: Vec<String>,
}

/// Report request body
#[derive(Debug, Deserialize, Validate)]
pub struct ReportIpRequest {
    #[validate(ip)]
    pub ip: String,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub categories: Vec<String>,
}

#[derive(FromRow)]
struct ReportedIpRow {
    id: i64,
    ip: String,
    report_count: i64,
    last_reported_at_ms: i64,
    status: String,
    categories: Json<Vec<String>>,
}

impl From<ReportedIpRow> for ReportedIp {
    fn from(row: ReportedIpRow) -> Self {
        Self {
            id: row.id,
            ip: row.ip,
            report_count: row.report_count,
            last_reported_at: DateTime::from_timestamp_millis(row.last_reported_at_ms).unwrap_or_default(),
            status: row.status,
            categories: row.categories.0,
        }
    }
}

impl ReportedIp {
    /// Insert a first report or bump count, timestamp and categories of an existing one.
    ///
    /// The category union is computed inside the upsert statement so concurrent
    /// reports for one IP never read a stale list.
    pub async fn upsert(
        pool: &SqlitePool,
        ip: &str,
        categories: &[String],
    ) -> Result<Self, sqlx::Error> {
        let incoming: Vec<String> = categories
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let row = sqlx::query_as::<_, ReportedIpRow>(
            r#"
            INSERT INTO reported_ips (ip, report_count, last_reported_at_ms, categories)
            VALUES (?1, 1, ?2, ?3)
            ON CONFLICT(ip) DO UPDATE SET
                report_count = report_count + 1,
                last_reported_at_ms = excluded.last_reported_at_ms,
                categories = (
                    SELECT json_group_array(value) FROM (
                        SELECT value FROM json_each(reported_ips.categories)
                        UNION
                        SELECT value FROM json_each(?3)
                        ORDER BY value
                    )
                )
            RETURNING *
            "#
        )
        .bind(ip)
        .bind(Utc::now().timestamp_millis())
        .bind(Json(&incoming))
        .fetch_one(pool)
        .await?;

        Ok(row.into())
    }

    /// Most recently reported first
    pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ReportedIpRow>(
            "SELECT * FROM reported_ips ORDER BY last_reported_at_ms DESC, id DESC LIMIT ?"
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(ReportedIp::from).collect())
    }

    pub async fn find_by_ip(pool: &SqlitePool, ip: &str) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, ReportedIpRow>("SELECT * FROM reported_ips WHERE ip = ?")
            .bind(ip)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(ReportedIp::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn cats(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_three_reports_merge_categories() {
        let pool = test_pool().await;

        ReportedIp::upsert(&pool, "198.51.100.4", &cats(&["x"])).await.unwrap();
        ReportedIp::upsert(&pool, "198.51.100.4", &cats(&["y"])).await.unwrap();
        let last = ReportedIp::upsert(&pool, "198.51.100.4", &cats(&["x"])).await.unwrap();

        assert_eq!(last.report_count, 3);
        assert_eq!(last.categories, cats(&["x", "y"]));
        assert_eq!(last.status, "New");

        let all = ReportedIp::list_recent(&pool, 10).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_first_report_creates_record() {
        let pool = test_pool().await;
        assert!(ReportedIp::find_by_ip(&pool, "192.0.2.1").await.unwrap().is_none());

        let report = ReportedIp::upsert(&pool, "192.0.2.1", &[]).await.unwrap();
        assert_eq!(report.report_count, 1);
        assert!(report.categories.is_empty());
        assert!(ReportedIp::find_by_ip(&pool, "192.0.2.1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let pool = test_pool().await;
        ReportedIp::upsert(&pool, "192.0.2.1", &[]).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        ReportedIp::upsert(&pool, "192.0.2.2", &[]).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        ReportedIp::upsert(&pool, "192.0.2.1", &[]).await.unwrap();

        let recent = ReportedIp::list_recent(&pool, 10).await.unwrap();
        let ips: Vec<&str> = recent.iter().map(|r| r.ip.as_str()).collect();
        assert_eq!(ips, vec!["192.0.2.1", "192.0.2.2"]);

        assert_eq!(ReportedIp::list_recent(&pool, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_reports_all_counted() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("reports.db").display());
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let pool = pool.clone();
                let category = if i % 2 == 0 { "scan" } else { "spam" };
                tokio::spawn(async move {
                    ReportedIp::upsert(&pool, "198.51.100.9", &cats(&[category])).await
                })
            })
            .collect();

        for handle in handles {
            tokio_test::assert_ok!(handle.await.unwrap());
        }

        let report = ReportedIp::find_by_ip(&pool, "198.51.100.9").await.unwrap().unwrap();
        assert_eq!(report.report_count, 20);
        assert_eq!(report.categories, cats(&["scan", "spam"]));
        pool.close().await;
    }

    #[tokio::test]
    async fn test_categories_are_trimmed_and_sorted() {
        let pool = test_pool().await;
        ReportedIp::upsert(&pool, "192.0.2.9", &cats(&["zeta", " alpha ", ""])).await.unwrap();
        let report = ReportedIp::upsert(&pool, "192.0.2.9", &cats(&["beta", "zeta"])).await.unwrap();

        assert_eq!(report.report_count, 2);
        assert_eq!(report.categories, cats(&["alpha", "beta", "zeta"]));
    }

    #[test]
    fn test_request_validation() {
        let ok = ReportIpRequest { ip: "2001:db8::1".into(), categories: cats(&["spam"]) };
        tokio_test::assert_ok!(ok.validate());

        let bad = ReportIpRequest { ip: "not-an-ip".into(), categories: vec![] };
        tokio_test::assert_err!(bad.validate());
    }
}
