//! Feature Vector - ordered flow features handed to the detector panel
//!
//! Carries the layout version and hash it was built against, so a vector
//! produced under another schema is rejected instead of being scored against
//! the wrong positions.

use serde::{Deserialize, Serialize};
use super::layout::{
    FEATURE_COUNT, FEATURE_VERSION,
    feature_index, layout_hash, validate_layout, validate_names, SchemaMismatch,
};

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout
    pub layout_hash: u32,
    /// Feature values in order defined by FEATURE_LAYOUT
    pub values: Vec<f32>,
}

impl FeatureVector {
    /// Zeroed vector for the current layout
    pub fn zeroed() -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values: vec![0.0; FEATURE_COUNT],
        }
    }

    /// Wrap raw values for the current layout.
    ///
    /// The length is not adjusted; a short or long vector fails `validate()`.
    pub fn from_vec(values: Vec<f32>) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    /// Build from `(name, value)` pairs that must follow FEATURE_LAYOUT exactly
    pub fn from_named<S: AsRef<str>>(pairs: &[(S, f32)]) -> Result<Self, SchemaMismatch> {
        let names: Vec<&str> = pairs.iter().map(|(name, _)| name.as_ref()).collect();
        validate_names(&names)?;
        Ok(Self::from_vec(pairs.iter().map(|(_, value)| *value).collect()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<f32> {
        feature_index(name).and_then(|i| self.get(i))
    }

    /// Set feature by name; returns false for unknown names
    pub fn set_by_name(&mut self, name: &str, value: f32) -> bool {
        match feature_index(name) {
            Some(index) if index < self.values.len() => {
                self.values[index] = value;
                true
            }
            _ => false,
        }
    }

    /// Check version, hash and arity against the current layout
    pub fn validate(&self) -> Result<(), SchemaMismatch> {
        validate_layout(self.version, self.layout_hash)?;
        if self.values.len() != FEATURE_COUNT {
            return Err(SchemaMismatch::Arity {
                expected: FEATURE_COUNT,
                actual: self.values.len(),
            });
        }
        Ok(())
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::zeroed()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builder for vectors where only a handful of features matter
pub struct FeatureVectorBuilder {
    vector: FeatureVector,
}

impl FeatureVectorBuilder {
    pub fn new() -> Self {
        Self { vector: FeatureVector::zeroed() }
    }

    /// Set feature by name; unknown names are ignored
    pub fn set(mut self, name: &str, value: f32) -> Self {
        self.vector.set_by_name(name, value);
        self
    }

    pub fn build(self) -> FeatureVector {
        self.vector
    }
}

impl Default for FeatureVectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::layout::FEATURE_LAYOUT;

    #[test]
    fn test_zeroed_vector_is_valid() {
        let vector = FeatureVector::zeroed();
        assert_eq!(vector.len(), FEATURE_COUNT);
        assert!(vector.validate().is_ok());
    }

    #[test]
    fn test_builder_sets_named_features() {
        let vector = FeatureVectorBuilder::new()
            .set("Flow Duration", 1200.0)
            .set("SYN Flag Count", 1.0)
            .set("not a feature", 9.0)
            .build();

        assert_eq!(vector.get_by_name("Flow Duration"), Some(1200.0));
        assert_eq!(vector.get_by_name("SYN Flag Count"), Some(1.0));
        assert_eq!(vector.get_by_name("not a feature"), None);
    }

    #[test]
    fn test_short_vector_fails_validation() {
        let vector = FeatureVector::from_vec(vec![1.0; 5]);
        assert_eq!(
            vector.validate(),
            Err(SchemaMismatch::Arity { expected: FEATURE_COUNT, actual: 5 })
        );
    }

    #[test]
    fn test_foreign_layout_hash_fails_validation() {
        let mut vector = FeatureVector::zeroed();
        vector.layout_hash ^= 0xdead_beef;
        assert!(matches!(vector.validate(), Err(SchemaMismatch::Layout { .. })));
    }

    #[test]
    fn test_from_named_requires_layout_order() {
        let mut pairs: Vec<(&str, f32)> = FEATURE_LAYOUT.iter().map(|n| (*n, 1.0)).collect();
        let vector = FeatureVector::from_named(&pairs).unwrap();
        assert!(vector.validate().is_ok());

        pairs.swap(0, 3);
        assert!(matches!(
            FeatureVector::from_named(&pairs),
            Err(SchemaMismatch::Name { index: 0, .. })
        ));
    }
}
