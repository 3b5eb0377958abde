//! Linear Classifier - logistic model over a sparse set of scaled features
//!
//! Coefficients are fixed at construction; the model only scores.

use super::{ensure_finite, reasons, resolve_features, Detector, DetectorError, DetectorVerdict};
use crate::logic::features::FeatureVector;

/// Probability at or above which the classifier reports a hit
pub const DEFAULT_DECISION_THRESHOLD: f32 = 0.5;

pub struct LinearClassifier {
    id: &'static str,
    reason: &'static str,
    /// (layout index, coefficient)
    terms: Vec<(usize, f32)>,
    bias: f32,
    threshold: f32,
}

impl LinearClassifier {
    pub fn new(
        id: &'static str,
        reason: &'static str,
        coefficients: &[(&str, f32)],
        bias: f32,
        threshold: f32,
    ) -> Result<Self, DetectorError> {
        let names: Vec<&str> = coefficients.iter().map(|(name, _)| *name).collect();
        let indices = resolve_features(&names)?;
        let terms = indices
            .into_iter()
            .zip(coefficients.iter().map(|(_, c)| *c))
            .collect();

        Ok(Self {
            id,
            reason,
            terms,
            bias,
            threshold,
        })
    }

    /// Injection payloads: heavy forward payload carried over many data packets
    pub fn sql_injection() -> Result<Self, DetectorError> {
        Self::new(
            "sqli_classifier",
            reasons::SQL_INJECTION,
            &[
                ("Fwd Packets Length Total", 1.0),
                ("Fwd Act Data Packets", 1.0),
            ],
            -6.0,
            DEFAULT_DECISION_THRESHOLD,
        )
    }

    /// Script payloads: one oversized forward packet with high length variance
    pub fn cross_site_scripting() -> Result<Self, DetectorError> {
        Self::new(
            "xss_classifier",
            reasons::CROSS_SITE_SCRIPTING,
            &[
                ("Fwd Packet Length Max", 1.0),
                ("Fwd Packet Length Std", 0.5),
            ],
            -5.0,
            DEFAULT_DECISION_THRESHOLD,
        )
    }

    /// Raw logit for a vector
    pub fn logit(&self, features: &FeatureVector) -> Result<f32, DetectorError> {
        self.terms.iter().try_fold(self.bias, |acc, &(index, coef)| {
            let value = features.get(index).ok_or(DetectorError::MissingFeature(index))?;
            Ok(acc + coef * value)
        })
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl Detector for LinearClassifier {
    fn id(&self) -> &'static str {
        self.id
    }

    fn reason(&self) -> &'static str {
        self.reason
    }

    fn detect(&self, features: &FeatureVector) -> Result<DetectorVerdict, DetectorError> {
        ensure_finite(features)?;
        let probability = sigmoid(self.logit(features)?);
        Ok(DetectorVerdict::new(
            self.id,
            probability >= self.threshold,
            Some(probability),
        ))
    }
}
