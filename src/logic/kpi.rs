//! KPI Aggregator - time-bucketed statistics over stored alerts
//!
//! Buckets are laid out before any alert is folded in, so empty windows are
//! reported as zero. An alert outside the bucket set is left out of every
//! figure, which keeps totals, averages and breakdowns consistent.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::assets::{AssetRegistry, Criticality};
use crate::models::Alert;

/// Criticality label for IPs missing from the registry
pub const UNKNOWN_CRITICALITY: &str = "Unknown";

const CRITICALITY_ORDER: [&str; 4] = [
    Criticality::High.as_str(),
    Criticality::Medium.as_str(),
    Criticality::Low.as_str(),
    UNKNOWN_CRITICALITY,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucketing {
    Hourly,
    Daily,
}

impl Bucketing {
    fn seconds(&self) -> i64 {
        match self {
            Bucketing::Hourly => 3_600,
            Bucketing::Daily => 86_400,
        }
    }

    fn label_format(&self) -> &'static str {
        match self {
            Bucketing::Hourly => "%Y-%m-%d %H:00",
            Bucketing::Daily => "%Y-%m-%d",
        }
    }

    /// Start of the bucket containing `t`
    pub fn truncate(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let secs = self.seconds();
        DateTime::from_timestamp(t.timestamp().div_euclid(secs) * secs, 0).unwrap_or(t)
    }
}

/// Bucketing and bucket count for a dashboard range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KpiWindow {
    pub bucketing: Bucketing,
    pub horizon: u32,
}

impl KpiWindow {
    /// One day or less: 24 hourly buckets; otherwise one bucket per day
    pub fn for_range_days(days: u32) -> Self {
        if days <= 1 {
            Self { bucketing: Bucketing::Hourly, horizon: 24 }
        } else {
            Self { bucketing: Bucketing::Daily, horizon: days }
        }
    }

    /// Start of the oldest bucket ending at `now`
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let back = i64::from(self.horizon.max(1) - 1) * self.bucketing.seconds();
        self.bucketing.truncate(now) - Duration::seconds(back)
    }
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalityCount {
    pub criticality: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    pub bucket: String,
    pub start: DateTime<Utc>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiReport {
    pub bucketing: Bucketing,
    pub total_alerts: u64,
    pub average_risk_score: f64,
    /// Highest count first, ties by label
    pub alerts_by_reason: Vec<ReasonCount>,
    /// Always High, Medium, Low, Unknown
    pub alerts_by_criticality: Vec<CriticalityCount>,
    /// Oldest bucket first
    pub alerts_over_time: Vec<TimeBucket>,
}

pub fn summarize(
    alerts: &[Alert],
    window: KpiWindow,
    now: DateTime<Utc>,
    assets: &AssetRegistry,
) -> KpiReport {
    let bucketing = window.bucketing;
    let step = Duration::seconds(bucketing.seconds());
    let first = window.since(now);

    let mut buckets: Vec<TimeBucket> = (0..window.horizon.max(1))
        .map(|i| {
            let start = first + step * i as i32;
            TimeBucket {
                bucket: start.format(bucketing.label_format()).to_string(),
                start,
                count: 0,
            }
        })
        .collect();
    let slots: HashMap<DateTime<Utc>, usize> =
        buckets.iter().enumerate().map(|(i, b)| (b.start, i)).collect();

    let mut total: u64 = 0;
    let mut score_sum: u64 = 0;
    let mut by_reason: HashMap<&str, u64> = HashMap::new();
    let mut by_criticality: HashMap<&'static str, u64> = HashMap::new();

    for alert in alerts {
        let Some(&slot) = slots.get(&bucketing.truncate(alert.timestamp)) else {
            continue;
        };
        buckets[slot].count += 1;
        total += 1;
        score_sum += u64::from(alert.risk_score);

        for reason in &alert.reasons {
            *by_reason.entry(reason.as_str()).or_default() += 1;
        }

        let criticality = assets
            .lookup(&alert.ip)
            .map(|a| a.criticality.as_str())
            .unwrap_or(UNKNOWN_CRITICALITY);
        *by_criticality.entry(criticality).or_default() += 1;
    }

    let average_risk_score = if total == 0 {
        0.0
    } else {
        ((score_sum as f64 / total as f64) * 100.0).round() / 100.0
    };

    let mut alerts_by_reason: Vec<ReasonCount> = by_reason
        .into_iter()
        .map(|(reason, count)| ReasonCount { reason: reason.to_string(), count })
        .collect();
    alerts_by_reason.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));

    let alerts_by_criticality = CRITICALITY_ORDER
        .iter()
        .map(|&criticality| CriticalityCount {
            criticality,
            count: by_criticality.get(criticality).copied().unwrap_or(0),
        })
        .collect();

    KpiReport {
        bucketing,
        total_alerts: total,
        average_risk_score,
        alerts_by_reason,
        alerts_by_criticality,
        alerts_over_time: buckets,
    }
}

// ============================================================================
// TESTS
// ============================================================================
