//! Event Source - producers of traffic events
//!
//! The pipeline pulls one event per tick through `EventSource`. Sources are
//! synchronous and keep their own state (RNG, cursor); they never touch the
//! stores or the hubs.

pub mod templates;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::features::{
    feature_index, FeatureVector, SchemaMismatch, FEATURE_COUNT,
    FEATURE_LAYOUT,
};
use templates::{
    AttackKind, FeatureRange, ATTACK_STATUSES, BENIGN_PATHS, BENIGN_PROFILE, BENIGN_STATUSES,
    BROWSER_USER_AGENT, CITIES, JITTER, METHODS, UNJITTERED,
};

/// Default share of events built from an attack template
pub const DEFAULT_MALICIOUS_RATIO: f64 = 0.3;

/// Share of events whose source is a known internal host
const INTERNAL_SOURCE_RATIO: f64 = 0.1;

// ============================================================================
// EVENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub country: String,
}

/// One observed request with its flow features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "ip")]
    pub source_ip: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub user_agent: String,
    pub location: Option<GeoLocation>,
    /// Set by synthetic sources for generated attacks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_type_simulated: Option<AttackKind>,
    pub features: FeatureVector,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("event source exhausted")]
    Exhausted,

    #[error("event generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Schema(#[from] SchemaMismatch),
}

pub trait EventSource: Send {
    fn next_event(&mut self) -> Result<TrafficEvent, SourceError>;
}

// ============================================================================
// SYNTHETIC SOURCE
// ============================================================================

/// Random benign and attack traffic built from fixed templates
pub struct SyntheticTrafficSource {
    rng: StdRng,
    malicious_ratio: f64,
    internal_hosts: Vec<String>,
}

impl SyntheticTrafficSource {
    pub fn new(malicious_ratio: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            malicious_ratio: malicious_ratio.clamp(0.0, 1.0),
            internal_hosts: Vec::new(),
        }
    }

    /// Occasionally use one of `hosts` as the source address
    pub fn with_internal_hosts(mut self, hosts: Vec<String>) -> Self {
        self.internal_hosts = hosts;
        self
    }

    /// Build one event; `attack` forces the template, `None` means benign
    pub fn generate(&mut self, attack: Option<AttackKind>) -> TrafficEvent {
        let (source_ip, location) = self.pick_source();

        let (method, path, status, user_agent) = match attack {
            Some(kind) => {
                let template = kind.template();
                (
                    self.pick(METHODS),
                    template.path.to_string(),
                    self.pick(ATTACK_STATUSES),
                    template.user_agent.to_string(),
                )
            }
            None => (
                self.pick(METHODS),
                self.pick(BENIGN_PATHS).to_string(),
                self.pick(BENIGN_STATUSES),
                BROWSER_USER_AGENT.to_string(),
            ),
        };

        let overrides = attack.map(|kind| kind.template().overrides).unwrap_or(&[]);
        let features = self.draw_features(overrides);

        TrafficEvent {
            timestamp: Utc::now(),
            source_ip,
            method: method.to_string(),
            path,
            status,
            user_agent,
            location,
            attack_type_simulated: attack,
            features,
        }
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        // All template tables are non-empty
        items.choose(&mut self.rng).copied().unwrap_or(items[0])
    }

    fn pick_source(&mut self) -> (String, Option<GeoLocation>) {
        if !self.internal_hosts.is_empty() && self.rng.gen_bool(INTERNAL_SOURCE_RATIO) {
            if let Some(ip) = self.internal_hosts.choose(&mut self.rng) {
                return (ip.clone(), None);
            }
        }

        let ip = format!(
            "{}.{}.{}.{}",
            self.rng.gen_range(1..=223),
            self.rng.gen_range(0..=255),
            self.rng.gen_range(0..=255),
            self.rng.gen_range(0..=255),
        );
        let location = CITIES.choose(&mut self.rng).map(|&(city, country, lat, lon)| GeoLocation {
            latitude: lat,
            longitude: lon,
            city: city.to_string(),
            country: country.to_string(),
        });
        (ip, location)
    }

    fn draw_features(&mut self, overrides: &[FeatureRange]) -> FeatureVector {
        let mut values = vec![0.0f32; FEATURE_COUNT];

        for &(name, low, high) in BENIGN_PROFILE.iter().chain(overrides) {
            if let Some(index) = feature_index(name) {
                values[index] = self.draw(low, high);
            }
        }

        for (value, name) in values.iter_mut().zip(FEATURE_LAYOUT) {
            if *value > 0.0 && !UNJITTERED.contains(name) {
                let spread = *value * JITTER;
                *value = self.rng.gen_range(*value - spread..=*value + spread);
            }
        }

        FeatureVector::from_vec(values)
    }

    fn draw(&mut self, low: f32, high: f32) -> f32 {
        if low >= high {
            low
        } else {
            self.rng.gen_range(low..=high)
        }
    }
}

impl EventSource for SyntheticTrafficSource {
    fn next_event(&mut self) -> Result<TrafficEvent, SourceError> {
        let attack = if self.rng.gen_bool(self.malicious_ratio) {
            AttackKind::ALL.choose(&mut self.rng).copied()
        } else {
            None
        };
        let event = self.generate(attack);
        event.features.validate()?;
        Ok(event)
    }
}

// ============================================================================
// TESTS
// ============================================================================
