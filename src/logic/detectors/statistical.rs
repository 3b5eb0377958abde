//! Statistical Detector - unsupervised outlier test on scaled features
//!
//! Scaled features are z-scores against the benign profile; a flow whose
//! largest absolute z-score crosses the threshold is an outlier.

use super::{ensure_finite, reasons, Detector, DetectorError, DetectorVerdict};
use crate::logic::features::FeatureVector;

pub const DEFAULT_Z_THRESHOLD: f32 = 50.0;

pub struct StatisticalDetector {
    threshold: f32,
}

impl StatisticalDetector {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Largest absolute z-score in the vector
    pub fn outlier_score(features: &FeatureVector) -> f32 {
        features.values.iter().fold(0.0f32, |acc, v| acc.max(v.abs()))
    }
}

impl Default for StatisticalDetector {
    fn default() -> Self {
        Self::new(DEFAULT_Z_THRESHOLD)
    }
}

impl Detector for StatisticalDetector {
    fn id(&self) -> &'static str {
        "statistical_anomaly"
    }

    fn reason(&self) -> &'static str {
        reasons::STATISTICAL_ANOMALY
    }

    fn detect(&self, features: &FeatureVector) -> Result<DetectorVerdict, DetectorError> {
        ensure_finite(features)?;
        let score = Self::outlier_score(features);
        let confidence = (score / (2.0 * self.threshold)).min(1.0);
        Ok(DetectorVerdict::new(self.id(), score >= self.threshold, Some(confidence)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::FeatureVectorBuilder;

    #[test]
    fn test_outlier_score_uses_absolute_value() {
        let vector = FeatureVectorBuilder::new()
            .set("Flow Duration", 3.0)
            .set("Init Fwd Win Bytes", -10.0)
            .build();
        assert_eq!(StatisticalDetector::outlier_score(&vector), 10.0);
    }

    #[test]
    fn test_flood_rate_triggers() {
        let detector = StatisticalDetector::default();
        let vector = FeatureVectorBuilder::new().set("Flow Packets/s", 6000.0).build();

        let verdict = detector.detect(&vector).unwrap();
        assert!(verdict.triggered);
        assert_eq!(verdict.confidence, Some(1.0));
    }

    #[test]
    fn test_moderate_deviation_does_not_trigger() {
        let detector = StatisticalDetector::default();
        let vector = FeatureVectorBuilder::new().set("Fwd Packet Length Max", 18.0).build();
        assert!(!detector.detect(&vector).unwrap().triggered);
    }
}
