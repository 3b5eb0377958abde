//! Detectors - independent judges of one scaled feature vector
//!
//! Every detector answers the same question through the same trait: did this
//! flow trigger you, and how sure are you. The ensemble never looks behind
//! the trait, so classifiers, outlier detectors and reconstruction models are
//! interchangeable panel members.

pub mod classifier;
pub mod reconstruction;
pub mod statistical;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::features::{layout_hash, FeatureVector};

pub use classifier::LinearClassifier;
pub use reconstruction::ReconstructionDetector;
pub use statistical::StatisticalDetector;

/// Reason labels reported by the built-in detectors
pub mod reasons {
    pub const SQL_INJECTION: &str = "SQL Injection Attempt";
    pub const CROSS_SITE_SCRIPTING: &str = "Cross-Site Scripting";
    pub const STATISTICAL_ANOMALY: &str = "Statistical Traffic Anomaly";
    pub const STRUCTURAL_ANOMALY: &str = "Structural Protocol Anomaly";
}

// ============================================================================
// VERDICT
// ============================================================================

/// One detector's answer for one vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorVerdict {
    pub detector_id: String,
    pub triggered: bool,
    pub confidence: Option<f32>,
}

impl DetectorVerdict {
    pub fn new(detector_id: &str, triggered: bool, confidence: Option<f32>) -> Self {
        Self {
            detector_id: detector_id.to_string(),
            triggered,
            confidence,
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectorError {
    #[error("non-finite value in feature '{0}'")]
    NonFinite(&'static str),

    #[error("feature index {0} is missing from the vector")]
    MissingFeature(usize),

    #[error("unknown feature '{0}' in detector definition")]
    UnknownFeature(String),

    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("detector panicked: {0}")]
    Panicked(String),
}

// ============================================================================
// DETECTOR TRAIT
// ============================================================================

/// Common detector interface for the ensemble panel
pub trait Detector: Send + Sync {
    /// Stable identifier, unique within a panel
    fn id(&self) -> &'static str;

    /// Human-readable reason reported when this detector triggers
    fn reason(&self) -> &'static str;

    /// Layout hash of the feature schema this detector was built against
    fn layout_hash(&self) -> u32 {
        layout_hash()
    }

    /// Judge one scaled feature vector
    fn detect(&self, features: &FeatureVector) -> Result<DetectorVerdict, DetectorError>;
}

/// Reject vectors carrying NaN or infinity, naming the first bad feature
pub(crate) fn ensure_finite(features: &FeatureVector) -> Result<(), DetectorError> {
    match features.values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(DetectorError::NonFinite(
            crate::logic::features::layout::feature_name(index).unwrap_or("unknown"),
        )),
        None => Ok(()),
    }
}

/// Resolve feature names to layout positions
pub(crate) fn resolve_features(names: &[&str]) -> Result<Vec<usize>, DetectorError> {
    names
        .iter()
        .map(|name| {
            crate::logic::features::feature_index(name)
                .ok_or_else(|| DetectorError::UnknownFeature(name.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::FeatureVectorBuilder;

    #[test]
    fn test_ensure_finite_names_feature() {
        let vector = FeatureVectorBuilder::new().set("Flow IAT Max", f32::INFINITY).build();
        assert_eq!(ensure_finite(&vector), Err(DetectorError::NonFinite("Flow IAT Max")));
        assert!(ensure_finite(&FeatureVector::zeroed()).is_ok());
    }

    #[test]
    fn test_resolve_features_rejects_unknown_names() {
        assert_eq!(resolve_features(&["Protocol", "Flow Duration"]), Ok(vec![0, 1]));
        assert_eq!(
            resolve_features(&["Protocol", "Bogus"]),
            Err(DetectorError::UnknownFeature("Bogus".to_string()))
        );
    }
}
