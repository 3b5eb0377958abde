//! Reconstruction Detector - reconstruction-error model over protocol structure
//!
//! Benign flows reconstruct to the scaled benign centroid on the monitored
//! features (handshake flags, forward packet count, byte rate, window size).
//! The mean squared reconstruction error grows when a flow's shape breaks
//! that structure, e.g. SYN-only bursts with no payload and no ACKs.

use super::{ensure_finite, reasons, resolve_features, Detector, DetectorError, DetectorVerdict};
use crate::logic::features::FeatureVector;

pub const DEFAULT_ERROR_THRESHOLD: f32 = 3.0;

const MONITORED_FEATURES: &[&str] = &[
    "SYN Flag Count",
    "ACK Flag Count",
    "Flow Bytes/s",
    "Total Fwd Packets",
    "Init Fwd Win Bytes",
];

pub struct ReconstructionDetector {
    monitored: Vec<usize>,
    /// Reconstruction of each monitored feature in scaled space
    reference: Vec<f32>,
    threshold: f32,
}

impl ReconstructionDetector {
    pub fn new(features: &[&str], threshold: f32) -> Result<Self, DetectorError> {
        let monitored = resolve_features(features)?;
        let reference = vec![0.0; monitored.len()];
        Ok(Self {
            monitored,
            reference,
            threshold,
        })
    }

    /// Detector over the default structural feature set
    pub fn structural() -> Result<Self, DetectorError> {
        Self::new(MONITORED_FEATURES, DEFAULT_ERROR_THRESHOLD)
    }

    /// Mean squared error between the vector and its reconstruction
    pub fn reconstruction_error(&self, features: &FeatureVector) -> Result<f32, DetectorError> {
        if self.monitored.is_empty() {
            return Ok(0.0);
        }

        let mut sum = 0.0f32;
        for (&index, &expected) in self.monitored.iter().zip(&self.reference) {
            let value = features.get(index).ok_or(DetectorError::MissingFeature(index))?;
            sum += (value - expected).powi(2);
        }
        Ok(sum / self.monitored.len() as f32)
    }
}

impl Detector for ReconstructionDetector {
    fn id(&self) -> &'static str {
        "structural_anomaly"
    }

    fn reason(&self) -> &'static str {
        reasons::STRUCTURAL_ANOMALY
    }

    fn detect(&self, features: &FeatureVector) -> Result<DetectorVerdict, DetectorError> {
        ensure_finite(features)?;
        let error = self.reconstruction_error(features)?;
        let confidence = (error / (2.0 * self.threshold)).min(1.0);
        Ok(DetectorVerdict::new(self.id(), error >= self.threshold, Some(confidence)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::FeatureVectorBuilder;

    #[test]
    fn test_centroid_reconstructs_perfectly() {
        let detector = ReconstructionDetector::structural().unwrap();
        assert_eq!(detector.reconstruction_error(&FeatureVector::zeroed()).unwrap(), 0.0);
    }

    #[test]
    fn test_syn_burst_triggers() {
        let detector = ReconstructionDetector::structural().unwrap();
        // Scaled shape of a SYN-only burst: SYN set, no ACK, no bytes, 10 fwd packets
        let vector = FeatureVectorBuilder::new()
            .set("SYN Flag Count", 1.0)
            .set("ACK Flag Count", -1.0)
            .set("Flow Bytes/s", -1.5)
            .set("Total Fwd Packets", 8.0)
            .build();

        let verdict = detector.detect(&vector).unwrap();
        assert!(verdict.triggered);
        assert!((detector.reconstruction_error(&vector).unwrap() - 13.65).abs() < 1e-3);
    }

    #[test]
    fn test_unmonitored_features_are_ignored() {
        let detector = ReconstructionDetector::structural().unwrap();
        let vector = FeatureVectorBuilder::new().set("Idle Max", 1000.0).build();
        assert!(!detector.detect(&vector).unwrap().triggered);
    }
}
