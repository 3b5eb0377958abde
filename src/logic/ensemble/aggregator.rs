//! Ensemble Aggregator
//!
//! Runs every registered detector in panel order and folds the answers into
//! one `Verdict`. Deterministic and side-effect free apart from logging:
//! - risk score = sum of weights of triggered detectors, saturated at 100
//! - reasons follow panel order, not detector timing
//! - a failing detector counts as "not triggered" and is reported as degraded

use std::panic::{catch_unwind, AssertUnwindSafe};

use super::playbook::PlaybookCatalog;
use super::types::{DegradedDetector, DetectorInfo, PanelError, Verdict};
use crate::logic::detectors::{
    Detector, DetectorError, DetectorVerdict, LinearClassifier, ReconstructionDetector,
    StatisticalDetector,
};
use crate::logic::features::{layout_hash, FeatureVector, SchemaMismatch};

/// Upper bound of the risk score
pub const MAX_RISK_SCORE: u32 = 100;

// ============================================================================
// DETECTOR PANEL
// ============================================================================

struct PanelEntry {
    detector: Box<dyn Detector>,
    weight: u32,
}

/// Detectors in fixed evaluation order, each with its risk weight
#[derive(Default)]
pub struct DetectorPanel {
    entries: Vec<PanelEntry>,
}

impl DetectorPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a detector; evaluation order is registration order
    pub fn register(&mut self, detector: Box<dyn Detector>, weight: u32) -> Result<(), PanelError> {
        let id = detector.id();
        if self.entries.iter().any(|e| e.detector.id() == id) {
            return Err(PanelError::DuplicateDetector(id.to_string()));
        }

        let expected = layout_hash();
        let actual = detector.layout_hash();
        if actual != expected {
            return Err(PanelError::SchemaMismatch {
                detector: id.to_string(),
                expected,
                actual,
            });
        }

        self.entries.push(PanelEntry { detector, weight });
        Ok(())
    }

    /// Built-in panel: two classifiers, then the two anomaly detectors
    pub fn with_defaults() -> Result<Self, PanelError> {
        let mut panel = Self::new();
        panel.register(Box::new(LinearClassifier::sql_injection()?), 40)?;
        panel.register(Box::new(LinearClassifier::cross_site_scripting()?), 35)?;
        panel.register(Box::new(StatisticalDetector::default()), 30)?;
        panel.register(Box::new(ReconstructionDetector::structural()?), 25)?;
        Ok(panel)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn describe(&self) -> Vec<DetectorInfo> {
        self.entries
            .iter()
            .enumerate()
            .map(|(position, e)| DetectorInfo {
                id: e.detector.id(),
                reason: e.detector.reason(),
                weight: e.weight,
                position,
            })
            .collect()
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

pub struct EnsembleAggregator {
    panel: DetectorPanel,
    playbooks: PlaybookCatalog,
}

impl EnsembleAggregator {
    pub fn new(panel: DetectorPanel, playbooks: PlaybookCatalog) -> Result<Self, PanelError> {
        if panel.is_empty() {
            return Err(PanelError::Empty);
        }
        Ok(Self { panel, playbooks })
    }

    /// Default panel with the built-in playbooks
    pub fn with_defaults() -> Result<Self, PanelError> {
        Self::new(DetectorPanel::with_defaults()?, PlaybookCatalog::builtin())
    }

    pub fn panel(&self) -> &DetectorPanel {
        &self.panel
    }

    /// Combine every detector's answer for one scaled vector
    pub fn evaluate(&self, features: &FeatureVector) -> Result<Verdict, SchemaMismatch> {
        features.validate()?;

        let mut score: u32 = 0;
        let mut reasons: Vec<String> = Vec::new();
        let mut degraded: Vec<DegradedDetector> = Vec::new();

        for entry in &self.panel.entries {
            let detector = entry.detector.as_ref();
            match run_isolated(detector, features) {
                Ok(verdict) if verdict.triggered => {
                    score = score.saturating_add(entry.weight).min(MAX_RISK_SCORE);
                    let reason = detector.reason();
                    if !reasons.iter().any(|r| r == reason) {
                        reasons.push(reason.to_string());
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(
                        detector = detector.id(),
                        error = %e,
                        "Detector failed, contribution treated as not triggered"
                    );
                    degraded.push(DegradedDetector {
                        detector_id: detector.id().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let playbook = self.playbooks.steps_for(&reasons);

        Ok(Verdict {
            is_malicious: !reasons.is_empty(),
            // score <= MAX_RISK_SCORE
            risk_score: score as u8,
            reasons,
            playbook,
            degraded,
        })
    }
}

/// Run one detector, turning a panic into a detector failure
fn run_isolated(
    detector: &dyn Detector,
    features: &FeatureVector,
) -> Result<DetectorVerdict, DetectorError> {
    match catch_unwind(AssertUnwindSafe(|| detector.detect(features))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(DetectorError::Panicked(message))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
