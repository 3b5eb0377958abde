//! Configuration module

use std::env;
use std::time::Duration;

use crate::logic::hub::DEFAULT_SUBSCRIBER_BUFFER;
use crate::logic::source::DEFAULT_MALICIOUS_RATIO;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Alert store location
    pub database_url: String,

    /// Server port
    pub port: u16,

    /// Pause between pipeline iterations
    pub event_interval: Duration,

    /// Pause after a failed iteration
    pub error_backoff: Duration,

    /// Per-subscriber queue length
    pub subscriber_buffer: usize,

    /// Share of synthetic events built from attack templates
    pub malicious_ratio: f64,

    /// Fixed RNG seed for reproducible synthetic streams
    pub generator_seed: Option<u64>,

    /// Allowed browser origin (any when unset)
    pub cors_origin: Option<String>,

    /// `text` or `json`
    pub log_format: String,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://traffic_sentinel.db".to_string()),

            port: parse_var("PORT").unwrap_or(8000),

            event_interval: Duration::from_millis(parse_var("EVENT_INTERVAL_MS").unwrap_or(1000)),

            error_backoff: Duration::from_millis(parse_var("ERROR_BACKOFF_MS").unwrap_or(2000)),

            subscriber_buffer: parse_var("SUBSCRIBER_BUFFER").unwrap_or(DEFAULT_SUBSCRIBER_BUFFER),

            malicious_ratio: parse_var::<f64>("MALICIOUS_RATIO")
                .filter(|r| (0.0..=1.0).contains(r))
                .unwrap_or(DEFAULT_MALICIOUS_RATIO),

            generator_seed: parse_var("GENERATOR_SEED"),

            cors_origin: env::var("CORS_ORIGIN").ok().filter(|o| !o.is_empty()),

            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "text".to_string()),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
impl Config {
    /// Fast settings for tests
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            event_interval: Duration::from_millis(1),
            error_backoff: Duration::from_millis(1),
            subscriber_buffer: 64,
            malicious_ratio: DEFAULT_MALICIOUS_RATIO,
            generator_seed: Some(42),
            cors_origin: None,
            log_format: "text".to_string(),
            environment: "test".to_string(),
        }
    }
}
