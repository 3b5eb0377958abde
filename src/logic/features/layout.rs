//! Feature Layout - Centralized Feature Definition
//!
//! **This file controls the feature schema shared by every detector.**
//!
//! ## Rules:
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! The event source, the scaler and the detector panel all resolve feature
//! positions through this table, and the ensemble refuses vectors whose
//! layout hash differs from the one computed here.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
/// MUST be incremented when layout changes
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Flow feature names in the exact order they appear in the vector
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Flow basics (0-5) ===
    "Protocol",
    "Flow Duration",
    "Total Fwd Packets",
    "Total Backward Packets",
    "Fwd Packets Length Total",
    "Bwd Packets Length Total",

    // === Packet lengths (6-13) ===
    "Fwd Packet Length Max",
    "Fwd Packet Length Min",
    "Fwd Packet Length Mean",
    "Fwd Packet Length Std",
    "Bwd Packet Length Max",
    "Bwd Packet Length Min",
    "Bwd Packet Length Mean",
    "Bwd Packet Length Std",

    // === Rates & inter-arrival times (14-29) ===
    "Flow Bytes/s",
    "Flow Packets/s",
    "Flow IAT Mean",
    "Flow IAT Std",
    "Flow IAT Max",
    "Flow IAT Min",
    "Fwd IAT Total",
    "Fwd IAT Mean",
    "Fwd IAT Std",
    "Fwd IAT Max",
    "Fwd IAT Min",
    "Bwd IAT Total",
    "Bwd IAT Mean",
    "Bwd IAT Std",
    "Bwd IAT Max",
    "Bwd IAT Min",

    // === Header flags & lengths (30-37) ===
    "Fwd PSH Flags",
    "Bwd PSH Flags",
    "Fwd URG Flags",
    "Bwd URG Flags",
    "Fwd Header Length",
    "Bwd Header Length",
    "Fwd Packets/s",
    "Bwd Packets/s",

    // === Packet length statistics (38-42) ===
    "Packet Length Min",
    "Packet Length Max",
    "Packet Length Mean",
    "Packet Length Std",
    "Packet Length Variance",

    // === TCP flag counters (43-50) ===
    "FIN Flag Count",
    "SYN Flag Count",
    "RST Flag Count",
    "PSH Flag Count",
    "ACK Flag Count",
    "URG Flag Count",
    "CWE Flag Count",
    "ECE Flag Count",

    // === Segments & bulk transfer (51-60) ===
    "Down/Up Ratio",
    "Avg Packet Size",
    "Avg Fwd Segment Size",
    "Avg Bwd Segment Size",
    "Fwd Avg Bytes/Bulk",
    "Fwd Avg Packets/Bulk",
    "Fwd Avg Bulk Rate",
    "Bwd Avg Bytes/Bulk",
    "Bwd Avg Packets/Bulk",
    "Bwd Avg Bulk Rate",

    // === Subflows & windows (61-68) ===
    "Subflow Fwd Packets",
    "Subflow Fwd Bytes",
    "Subflow Bwd Packets",
    "Subflow Bwd Bytes",
    "Init Fwd Win Bytes",
    "Init Bwd Win Bytes",
    "Fwd Act Data Packets",
    "Fwd Seg Size Min",

    // === Activity / idle (69-76) ===
    "Active Mean",
    "Active Std",
    "Active Max",
    "Active Min",
    "Idle Mean",
    "Idle Std",
    "Idle Max",
    "Idle Min",
];

/// Total number of features
/// IMPORTANT: Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 77;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of the feature layout
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

pub fn layout_hash() -> u32 {
    compute_layout_hash()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for status endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ============================================================================
// SCHEMA VALIDATION
// ============================================================================

/// Feature vector shape or names do not match the layout
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaMismatch {
    #[error("feature layout mismatch: expected v{expected_version} (hash: {expected_hash:08x}), got v{actual_version} (hash: {actual_hash:08x})")]
    Layout {
        expected_version: u8,
        expected_hash: u32,
        actual_version: u8,
        actual_hash: u32,
    },

    #[error("feature arity mismatch: expected {expected}, got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("feature {index} should be '{expected}', got '{actual}'")]
    Name {
        index: usize,
        expected: &'static str,
        actual: String,
    },
}

/// Validate a version/hash pair against the current layout
pub fn validate_layout(incoming_version: u8, incoming_hash: u32) -> Result<(), SchemaMismatch> {
    let current_hash = layout_hash();

    if incoming_version != FEATURE_VERSION || incoming_hash != current_hash {
        return Err(SchemaMismatch::Layout {
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: incoming_version,
            actual_hash: incoming_hash,
        });
    }

    Ok(())
}

/// Validate an ordered list of feature names against the layout
pub fn validate_names<S: AsRef<str>>(names: &[S]) -> Result<(), SchemaMismatch> {
    if names.len() != FEATURE_COUNT {
        return Err(SchemaMismatch::Arity {
            expected: FEATURE_COUNT,
            actual: names.len(),
        });
    }

    for (index, (expected, actual)) in FEATURE_LAYOUT.iter().zip(names).enumerate() {
        if *expected != actual.as_ref() {
            return Err(SchemaMismatch::Name {
                index,
                expected,
                actual: actual.as_ref().to_string(),
            });
        }
    }

    Ok(())
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

/// Get feature name by index
pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_layout_names_are_unique() {
        let mut names: Vec<&str> = FEATURE_LAYOUT.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_layout_hash_consistency() {
        assert_eq!(compute_layout_hash(), compute_layout_hash());
        assert_ne!(layout_hash(), 0);
    }

    #[test]
    fn test_validate_layout() {
        assert!(validate_layout(FEATURE_VERSION, layout_hash()).is_ok());
        assert!(validate_layout(FEATURE_VERSION + 1, layout_hash()).is_err());
        assert!(validate_layout(FEATURE_VERSION, !layout_hash()).is_err());
    }

    #[test]
    fn test_validate_names_rejects_reordering() {
        let mut names: Vec<&str> = FEATURE_LAYOUT.to_vec();
        assert!(validate_names(&names).is_ok());

        names.swap(1, 2);
        match validate_names(&names) {
            Err(SchemaMismatch::Name { index, expected, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(expected, "Flow Duration");
            }
            other => panic!("expected name mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_names_rejects_wrong_arity() {
        let names = &FEATURE_LAYOUT[..10];
        assert_eq!(
            validate_names(names),
            Err(SchemaMismatch::Arity { expected: FEATURE_COUNT, actual: 10 })
        );
    }

    #[test]
    fn test_feature_index() {
        assert_eq!(feature_index("Protocol"), Some(0));
        assert_eq!(feature_index("Idle Min"), Some(FEATURE_COUNT - 1));
        assert_eq!(feature_index("nonexistent"), None);
        assert_eq!(feature_name(1), Some("Flow Duration"));
        assert_eq!(feature_name(500), None);
    }
}
