//! Feature Scaler - shared preprocessing in front of the detector panel
//!
//! Standard scaling against the benign traffic profile: every detector sees
//! `(x - mean) / scale`, so "distance from normal" means the same thing for
//! the classifiers and the anomaly detectors.

use serde::{Deserialize, Serialize};

use super::layout::{feature_index, FEATURE_COUNT};
use super::vector::FeatureVector;
use super::layout::SchemaMismatch;

/// Lower bound on a feature's scale so constant features stay finite
const MIN_SCALE: f32 = 1.0;

/// Share of the mean used as scale floor for (near-)constant features
const RELATIVE_SCALE: f32 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl FeatureScaler {
    /// Identity scaler (mean 0, scale 1)
    pub fn identity() -> Self {
        Self {
            mean: vec![0.0; FEATURE_COUNT],
            scale: vec![1.0; FEATURE_COUNT],
        }
    }

    /// Derive scaling parameters from `(feature, low, high)` ranges.
    ///
    /// Features absent from the profile are treated as a constant 0.
    /// Unknown feature names are ignored.
    pub fn from_profile(profile: &[(&str, f32, f32)]) -> Self {
        let mut scaler = Self::identity();

        for &(name, low, high) in profile {
            let Some(index) = feature_index(name) else {
                tracing::debug!(feature = name, "Profile entry has no layout slot, skipped");
                continue;
            };
            let mean = (low + high) / 2.0;
            let half_range = (high - low).abs() / 2.0;
            scaler.mean[index] = mean;
            scaler.scale[index] = half_range.max(mean.abs() * RELATIVE_SCALE).max(MIN_SCALE);
        }

        scaler
    }

    /// Scale a vector; fails if it does not match the layout
    pub fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, SchemaMismatch> {
        features.validate()?;

        let values = features
            .values
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect();

        Ok(FeatureVector {
            values,
            ..features.clone()
        })
    }
}

impl Default for FeatureScaler {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::vector::FeatureVectorBuilder;

    #[test]
    fn test_profile_centres_ranges() {
        let scaler = FeatureScaler::from_profile(&[("Flow Duration", 100.0, 300.0)]);
        let vector = FeatureVectorBuilder::new().set("Flow Duration", 300.0).build();

        let scaled = scaler.transform(&vector).unwrap();
        assert_eq!(scaled.get_by_name("Flow Duration"), Some(1.0));
    }

    #[test]
    fn test_constant_feature_uses_relative_scale() {
        let scaler = FeatureScaler::from_profile(&[("Init Fwd Win Bytes", 8192.0, 8192.0)]);
        let index = feature_index("Init Fwd Win Bytes").unwrap();
        assert!((scaler.scale[index] - 819.2).abs() < 1e-3);
    }

    #[test]
    fn test_zero_constant_keeps_min_scale() {
        let scaler = FeatureScaler::from_profile(&[("SYN Flag Count", 0.0, 0.0)]);
        let index = feature_index("SYN Flag Count").unwrap();
        assert_eq!(scaler.scale[index], MIN_SCALE);
    }

    #[test]
    fn test_transform_rejects_wrong_arity() {
        let scaler = FeatureScaler::identity();
        let vector = FeatureVector::from_vec(vec![0.0; 3]);
        assert!(scaler.transform(&vector).is_err());
    }
}
