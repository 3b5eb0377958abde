//! Traffic Sentinel Server
//!
//! Scores a live stream of traffic events with a detector ensemble and fans
//! the results out to dashboards.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TRAFFIC SENTINEL                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐   ┌───────────────────────┐  │
//! │  │  Event    │──►│ Detector  │──►│  Subscriber Hubs      │  │
//! │  │  Source   │   │ Ensemble  │   │  (raw / processed WS) │  │
//! │  └───────────┘   └─────┬─────┘   └───────────────────────┘  │
//! │        Pipeline Loop   │                                    │
//! │                        ▼                                    │
//! │                 ┌─────────────┐     ┌──────────────────┐    │
//! │                 │   SQLite    │◄────│  KPI / REST API  │    │
//! │                 └─────────────┘     │     (Axum)       │    │
//! │                                     └──────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod error;
mod handlers;
mod logic;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use sqlx::SqlitePool;
use tokio::sync::watch;
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logic::assets::AssetRegistry;
use logic::ensemble::EnsembleAggregator;
use logic::features::FeatureScaler;
use logic::hub::{SubscriberHub, Topic};
use logic::pipeline::{Pipeline, PipelineContext, PipelineStats};
use logic::source::{templates::BENIGN_PROFILE, SyntheticTrafficSource};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    init_tracing(&config);

    tracing::info!("Traffic Sentinel starting...");
    tracing::info!("Database: {}", config.database_url);

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await
        .context("Failed to run migrations")?;

    // Detector panel must be established before anything runs
    let ensemble = EnsembleAggregator::with_defaults()
        .context("Failed to establish detector panel")?;
    for detector in ensemble.panel().describe() {
        tracing::info!(
            detector = detector.id,
            weight = detector.weight,
            position = detector.position,
            "Detector registered"
        );
    }

    if config.is_production() && config.cors_origin.is_none() {
        tracing::warn!("CORS_ORIGIN unset in production, allowing any origin");
    }

    // Build application state
    let state = AppState::new(pool, config.clone(), ensemble);

    // Start pipeline
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let source = SyntheticTrafficSource::new(config.malicious_ratio, config.generator_seed)
        .with_internal_hosts(state.assets.ips());
    let pipeline = Pipeline::new(
        source,
        state.pipeline_context(),
        config.event_interval,
        config.error_backoff,
    );
    let pipeline_task = tokio::spawn(pipeline.run(shutdown_rx.clone()));

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
        let _ = shutdown_tx.send(true);
    });

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .context("Server error")?;

    pipeline_task.await.context("Pipeline task failed")?;
    tracing::info!("Traffic Sentinel stopped");
    Ok(())
}

fn init_tracing(config: &config::Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "traffic_sentinel=debug,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: config::Config,
    pub ensemble: Arc<EnsembleAggregator>,
    pub scaler: Arc<FeatureScaler>,
    pub raw_hub: Arc<SubscriberHub>,
    pub processed_hub: Arc<SubscriberHub>,
    pub assets: Arc<AssetRegistry>,
    pub stats: Arc<PipelineStats>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: config::Config, ensemble: EnsembleAggregator) -> Self {
        let buffer = config.subscriber_buffer;
        Self {
            pool,
            config,
            ensemble: Arc::new(ensemble),
            scaler: Arc::new(FeatureScaler::from_profile(BENIGN_PROFILE)),
            raw_hub: Arc::new(SubscriberHub::new(Topic::Raw, buffer)),
            processed_hub: Arc::new(SubscriberHub::new(Topic::Processed, buffer)),
            assets: Arc::new(AssetRegistry::seeded()),
            stats: Arc::new(PipelineStats::new()),
        }
    }

    /// Handles the pipeline loop shares with the HTTP layer
    pub fn pipeline_context(&self) -> PipelineContext {
        PipelineContext {
            pool: self.pool.clone(),
            ensemble: Arc::clone(&self.ensemble),
            scaler: Arc::clone(&self.scaler),
            raw_hub: Arc::clone(&self.raw_hub),
            processed_hub: Arc::clone(&self.processed_hub),
            assets: Arc::clone(&self.assets),
            stats: Arc::clone(&self.stats),
        }
    }
}

fn cors_layer(config: &config::Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any);

    match config.cors_origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(_)) => {
            tracing::warn!("Invalid CORS_ORIGIN, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Live streams (not compressed)
    let stream_routes = Router::new()
        .route("/ws/raw", get(handlers::stream::raw))
        .route("/ws/processed", get(handlers::stream::processed));

    // REST API
    let api_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/kpis", get(handlers::kpis::report))
        .route("/api/alerts/recent", get(handlers::alerts::recent))
        .route("/api/assets", get(handlers::assets::list))
        .route("/api/report_ip", post(handlers::reports::report_ip))
        .route("/api/reported_ips", get(handlers::reports::list))
        .route("/api/pipeline/status", get(handlers::status::pipeline))
        .layer(CompressionLayer::new());

    let cors = cors_layer(&state.config);

    // Combine all routes
    Router::new()
        .merge(stream_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// TESTS
// ============================================================================
