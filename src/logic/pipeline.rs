//! Pipeline Loop - generate, score, store and publish, one event per tick
//!
//! ```text
//! EventSource ─► register asset ─► raw hub
//!                      │
//!                      ▼
//!               scaler ─► ensemble ─► (malicious) ─► alert store ─► processed hub
//! ```
//!
//! A tick is strictly sequential. Any failure inside a tick is logged and
//! counted, then the loop sleeps for the backoff and carries on; only the
//! shutdown signal ends it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::watch;

use super::assets::{Asset, AssetRegistry};
use super::ensemble::{DegradedDetector, EnsembleAggregator, Verdict};
use super::features::FeatureScaler;
use super::hub::{BroadcastReport, SubscriberHub};
use super::source::{EventSource, TrafficEvent};
use crate::error::PipelineError;
use crate::models::{Alert, NewAlert};

// ============================================================================
// STATS
// ============================================================================

#[derive(Debug)]
pub struct PipelineStats {
    started_at: DateTime<Utc>,
    events_processed: AtomicU64,
    alerts_raised: AtomicU64,
    alerts_stored: AtomicU64,
    storage_failures: AtomicU64,
    skipped_iterations: AtomicU64,
    degraded_evaluations: AtomicU64,
    messages_dropped: AtomicU64,
    subscribers_removed: AtomicU64,
    last_error: Mutex<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatsSnapshot {
    pub started_at: DateTime<Utc>,
    pub events_processed: u64,
    pub alerts_raised: u64,
    pub alerts_stored: u64,
    pub storage_failures: u64,
    pub skipped_iterations: u64,
    pub degraded_evaluations: u64,
    pub messages_dropped: u64,
    pub subscribers_removed: u64,
    pub last_error: Option<String>,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            events_processed: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
            alerts_stored: AtomicU64::new(0),
            storage_failures: AtomicU64::new(0),
            skipped_iterations: AtomicU64::new(0),
            degraded_evaluations: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            subscribers_removed: AtomicU64::new(0),
            last_error: Mutex::new(None),
        }
    }
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_error(&self, error: &PipelineError) {
        *self.last_error.lock() = Some(error.to_string());
    }

    fn record_broadcast(&self, report: BroadcastReport) {
        self.messages_dropped.fetch_add(report.dropped as u64, Ordering::Relaxed);
        self.subscribers_removed.fetch_add(report.removed as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            started_at: self.started_at,
            events_processed: self.events_processed.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            alerts_stored: self.alerts_stored.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            skipped_iterations: self.skipped_iterations.load(Ordering::Relaxed),
            degraded_evaluations: self.degraded_evaluations.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            subscribers_removed: self.subscribers_removed.load(Ordering::Relaxed),
            last_error: self.last_error.lock().clone(),
        }
    }
}

// ============================================================================
// PAYLOADS
// ============================================================================

/// Event plus verdict, as published on the processed topic
#[derive(Serialize)]
struct ProcessedPayload<'a> {
    #[serde(flatten)]
    event: &'a TrafficEvent,
    risk_score: u8,
    reason: String,
    reasons: &'a [String],
    playbook: &'a [String],
    #[serde(skip_serializing_if = "none_degraded")]
    degraded: &'a [DegradedDetector],
}

fn none_degraded(degraded: &&[DegradedDetector]) -> bool {
    degraded.is_empty()
}

impl<'a> ProcessedPayload<'a> {
    fn new(event: &'a TrafficEvent, verdict: &'a Verdict) -> Self {
        Self {
            event,
            risk_score: verdict.risk_score,
            reason: verdict.joined_reason(),
            reasons: &verdict.reasons,
            playbook: &verdict.playbook,
            degraded: &verdict.degraded,
        }
    }
}

/// Fan out one payload; unreachable subscribers are dropped, never retried
fn publish(ctx: &PipelineContext, hub: &SubscriberHub, payload: String) {
    let report = hub.broadcast(payload);
    if report.removed > 0 {
        let error = PipelineError::Broadcast {
            topic: hub.topic().as_str(),
            reason: format!("{} subscriber(s) unreachable", report.removed),
        };
        tracing::debug!(error = %error, "Subscribers removed");
    }
    ctx.stats.record_broadcast(report);
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Shared handles the loop works against
#[derive(Clone)]
pub struct PipelineContext {
    pub pool: SqlitePool,
    pub ensemble: Arc<EnsembleAggregator>,
    pub scaler: Arc<FeatureScaler>,
    pub raw_hub: Arc<SubscriberHub>,
    pub processed_hub: Arc<SubscriberHub>,
    pub assets: Arc<AssetRegistry>,
    pub stats: Arc<PipelineStats>,
}

/// What one successful tick did
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub verdict: Verdict,
    /// Row id when the alert was stored
    pub alert_id: Option<i64>,
}

pub struct Pipeline<S: EventSource> {
    source: S,
    ctx: PipelineContext,
    interval: Duration,
    backoff: Duration,
}

impl<S: EventSource> Pipeline<S> {
    pub fn new(source: S, ctx: PipelineContext, interval: Duration, backoff: Duration) -> Self {
        Self {
            source,
            ctx,
            interval,
            backoff,
        }
    }

    /// One iteration; storage failures are absorbed, everything else aborts the tick
    pub async fn tick(&mut self) -> Result<TickOutcome, PipelineError> {
        let ctx = &self.ctx;

        let event = self.source.next_event()?;
        ctx.stats.events_processed.fetch_add(1, Ordering::Relaxed);

        ctx.assets.register_if_absent(&event.source_ip, Asset::auto_discovered());

        let raw = serde_json::to_string(&event)?;
        publish(ctx, &ctx.raw_hub, raw);

        let scaled = ctx.scaler.transform(&event.features)?;
        let verdict = ctx.ensemble.evaluate(&scaled)?;
        if !verdict.degraded.is_empty() {
            ctx.stats.degraded_evaluations.fetch_add(1, Ordering::Relaxed);
            for degraded in &verdict.degraded {
                let error = PipelineError::DetectorFailure {
                    detector: degraded.detector_id.clone(),
                    reason: degraded.error.clone(),
                };
                tracing::warn!(ip = %event.source_ip, kind = error.kind(), error = %error, "Detector degraded");
                ctx.stats.record_error(&error);
            }
        }

        if !verdict.is_malicious {
            tracing::debug!(ip = %event.source_ip, "Benign event");
            return Ok(TickOutcome { verdict, alert_id: None });
        }

        ctx.stats.alerts_raised.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            ip = %event.source_ip,
            risk_score = verdict.risk_score,
            reasons = %verdict.joined_reason(),
            "Malicious event"
        );

        let alert_id = match Alert::insert(&ctx.pool, &NewAlert::from_event(&event, &verdict)).await {
            Ok(id) => {
                ctx.stats.alerts_stored.fetch_add(1, Ordering::Relaxed);
                Some(id)
            }
            Err(e) => {
                let error = PipelineError::Storage(e);
                tracing::error!(ip = %event.source_ip, error = %error, "Alert dropped");
                ctx.stats.storage_failures.fetch_add(1, Ordering::Relaxed);
                ctx.stats.record_error(&error);
                None
            }
        };

        let processed = serde_json::to_string(&ProcessedPayload::new(&event, &verdict))?;
        publish(ctx, &ctx.processed_hub, processed);

        Ok(TickOutcome { verdict, alert_id })
    }

    /// Tick until `shutdown` flips to true or its sender goes away
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            detectors = self.ctx.ensemble.panel().len(),
            "Pipeline started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let pause = match self.tick().await {
                Ok(_) => self.interval,
                Err(e) => {
                    tracing::warn!(kind = e.kind(), error = %e, "Pipeline iteration skipped");
                    self.ctx.stats.skipped_iterations.fetch_add(1, Ordering::Relaxed);
                    self.ctx.stats.record_error(&e);
                    self.backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.ctx.raw_hub.close_all();
        self.ctx.processed_hub.close_all();
        tracing::info!("Pipeline stopped");
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use crate::db::test_pool;
    use crate::logic::detectors::{Detector, DetectorError, DetectorVerdict};
    use crate::logic::ensemble::{DetectorPanel, PlaybookCatalog};
    use crate::logic::features::FeatureVector;
    use crate::logic::hub::Topic;
    use crate::logic::source::templates::{AttackKind, BENIGN_PROFILE};
    use crate::logic::source::{SourceError, SyntheticTrafficSource};

    /// Replays a fixed script, then reports exhaustion
    struct ScriptedSource {
        script: VecDeque<Result<TrafficEvent, SourceError>>,
    }

    impl EventSource for ScriptedSource {
        fn next_event(&mut self) -> Result<TrafficEvent, SourceError> {
            self.script.pop_front().unwrap_or(Err(SourceError::Exhausted))
        }
    }

    fn event(attack: Option<AttackKind>, ip: &str) -> TrafficEvent {
        let mut event = SyntheticTrafficSource::new(0.0, Some(9)).generate(attack);
        event.source_ip = ip.to_string();
        event
    }

    async fn context() -> PipelineContext {
        PipelineContext {
            pool: test_pool().await,
            ensemble: Arc::new(EnsembleAggregator::with_defaults().unwrap()),
            scaler: Arc::new(FeatureScaler::from_profile(BENIGN_PROFILE)),
            raw_hub: Arc::new(SubscriberHub::new(Topic::Raw, 64)),
            processed_hub: Arc::new(SubscriberHub::new(Topic::Processed, 64)),
            assets: Arc::new(AssetRegistry::seeded()),
            stats: Arc::new(PipelineStats::new()),
        }
    }

    fn pipeline(ctx: PipelineContext, script: Vec<Result<TrafficEvent, SourceError>>) -> Pipeline<ScriptedSource> {
        Pipeline::new(
            ScriptedSource { script: script.into() },
            ctx,
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn test_malicious_event_stored_and_published() {
        let ctx = context().await;
        let mut raw = ctx.raw_hub.subscribe();
        let mut processed = ctx.processed_hub.subscribe();
        let mut pipeline = pipeline(ctx.clone(), vec![Ok(event(Some(AttackKind::SqlInjection), "203.0.113.50"))]);

        let outcome = pipeline.tick().await.unwrap();
        assert!(outcome.verdict.is_malicious);
        assert!(outcome.alert_id.is_some());

        let raw_msg: serde_json::Value = serde_json::from_str(&raw.rx.try_recv().unwrap()).unwrap();
        assert_eq!(raw_msg["ip"], "203.0.113.50");
        assert!(raw_msg.get("risk_score").is_none());

        let msg: serde_json::Value = serde_json::from_str(&processed.rx.try_recv().unwrap()).unwrap();
        assert_eq!(msg["ip"], "203.0.113.50");
        assert_eq!(msg["risk_score"], 40);
        assert_eq!(msg["reasons"][0], "SQL Injection Attempt");
        assert_eq!(msg["reason"], "SQL Injection Attempt");
        assert!(msg["playbook"].as_array().unwrap().len() >= 3);

        let stored = Alert::list_recent(&ctx.pool, 5).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].risk_score, 40);
        assert_eq!(ctx.assets.lookup("203.0.113.50"), Some(Asset::auto_discovered()));
    }

    #[tokio::test]
    async fn test_benign_event_only_reaches_raw_topic() {
        let ctx = context().await;
        let mut raw = ctx.raw_hub.subscribe();
        let mut processed = ctx.processed_hub.subscribe();
        let mut pipeline = pipeline(ctx.clone(), vec![Ok(event(None, "198.51.100.1"))]);

        let outcome = pipeline.tick().await.unwrap();
        assert_eq!(outcome.verdict, Verdict::benign());
        assert!(raw.rx.try_recv().is_ok());
        assert!(processed.rx.try_recv().is_err());
        assert_eq!(Alert::count(&ctx.pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_drops_alert_but_publishes() {
        let ctx = context().await;
        ctx.pool.close().await;
        let mut processed = ctx.processed_hub.subscribe();
        let mut pipeline = pipeline(ctx.clone(), vec![Ok(event(Some(AttackKind::XssAttack), "192.0.2.77"))]);

        let outcome = pipeline.tick().await.unwrap();
        assert!(outcome.verdict.is_malicious);
        assert_eq!(outcome.alert_id, None);
        assert!(processed.rx.try_recv().is_ok());

        let stats = ctx.stats.snapshot();
        assert_eq!(stats.storage_failures, 1);
        assert_eq!(stats.alerts_stored, 0);
        assert!(stats.last_error.unwrap().contains("alert storage failed"));
    }

    /// Panel member whose model never loaded
    struct Unavailable;

    impl Detector for Unavailable {
        fn id(&self) -> &'static str {
            "offline_model"
        }
        fn reason(&self) -> &'static str {
            "Offline"
        }
        fn detect(&self, _: &FeatureVector) -> Result<DetectorVerdict, DetectorError> {
            Err(DetectorError::Unavailable("weights not loaded".into()))
        }
    }

    #[tokio::test]
    async fn test_degraded_detector_is_recorded_as_detector_failure() {
        let mut ctx = context().await;
        let mut panel = DetectorPanel::with_defaults().unwrap();
        panel.register(Box::new(Unavailable), 10).unwrap();
        ctx.ensemble = Arc::new(EnsembleAggregator::new(panel, PlaybookCatalog::builtin()).unwrap());

        let mut processed = ctx.processed_hub.subscribe();
        let mut pipeline = pipeline(ctx.clone(), vec![Ok(event(Some(AttackKind::SqlInjection), "203.0.113.60"))]);

        let outcome = pipeline.tick().await.unwrap();
        assert!(outcome.verdict.is_malicious);
        assert_eq!(outcome.verdict.degraded.len(), 1);
        assert_eq!(outcome.verdict.degraded[0].detector_id, "offline_model");

        let msg: serde_json::Value = serde_json::from_str(&processed.rx.try_recv().unwrap()).unwrap();
        assert_eq!(msg["degraded"][0]["detector_id"], "offline_model");

        let stats = ctx.stats.snapshot();
        assert_eq!(stats.degraded_evaluations, 1);
        assert_eq!(
            stats.last_error.as_deref(),
            Some("detector offline_model failed: model unavailable: weights not loaded")
        );
    }

    #[tokio::test]
    async fn test_wrong_arity_fails_tick_with_schema_mismatch() {
        let ctx = context().await;
        let mut bad = event(None, "192.0.2.1");
        bad.features = FeatureVector::from_vec(vec![0.0; 5]);
        let mut pipeline = pipeline(ctx, vec![Ok(bad)]);

        let err = pipeline.tick().await.unwrap_err();
        assert_eq!(err.kind(), "schema_mismatch");
    }

    #[tokio::test]
    async fn test_loop_survives_failed_iteration() {
        let ctx = context().await;
        let mut raw = ctx.raw_hub.subscribe();

        let script: Vec<Result<TrafficEvent, SourceError>> = (1..=10)
            .map(|i| {
                if i == 5 {
                    Err(SourceError::Generation("sensor offline".into()))
                } else {
                    Ok(event(Some(AttackKind::StructuralAnomaly), &format!("10.9.0.{i}")))
                }
            })
            .collect();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(pipeline(ctx.clone(), script).run(shutdown_rx));

        let mut ips = Vec::new();
        while ips.len() < 9 {
            let msg = tokio::time::timeout(Duration::from_secs(5), raw.rx.recv())
                .await
                .unwrap()
                .unwrap();
            let value: serde_json::Value = serde_json::from_str(&msg).unwrap();
            ips.push(value["ip"].as_str().unwrap().to_string());
        }

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let expected: Vec<String> = [1, 2, 3, 4, 6, 7, 8, 9, 10]
            .iter()
            .map(|i| format!("10.9.0.{i}"))
            .collect();
        assert_eq!(ips, expected);

        let stored = Alert::query_range(&ctx.pool, DateTime::<Utc>::MIN_UTC).await.unwrap();
        let stored_ips: Vec<String> = stored.into_iter().map(|a| a.ip).collect();
        assert_eq!(stored_ips, expected);

        let stats = ctx.stats.snapshot();
        assert_eq!(stats.events_processed, 9);
        assert!(stats.skipped_iterations >= 1);

        // shutdown closes live subscriptions
        assert_eq!(ctx.raw_hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_sender_stops_loop() {
        let ctx = context().await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(pipeline(ctx, vec![]).run(shutdown_rx));

        drop(shutdown_tx);
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
