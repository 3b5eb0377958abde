//! Ensemble Types
//!
//! Data structures only; the combination logic lives in `aggregator.rs`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::detectors::DetectorError;

/// Separator used when reasons are flattened into one display string
pub const REASON_SEPARATOR: &str = ", ";

// ============================================================================
// VERDICT
// ============================================================================

/// Combined risk judgment for one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_malicious: bool,
    /// Sum of triggered detector weights, saturated at 100
    pub risk_score: u8,
    /// Distinct reason labels in panel order
    pub reasons: Vec<String>,
    /// Distinct remediation steps, first contributing reason first
    pub playbook: Vec<String>,
    /// Detectors that failed during this evaluation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<DegradedDetector>,
}

impl Verdict {
    pub fn benign() -> Self {
        Self {
            is_malicious: false,
            risk_score: 0,
            reasons: vec![],
            playbook: vec![],
            degraded: vec![],
        }
    }

    /// Reasons as one display string
    pub fn joined_reason(&self) -> String {
        self.reasons.join(REASON_SEPARATOR)
    }
}

/// A detector whose contribution was dropped for this evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedDetector {
    pub detector_id: String,
    pub error: String,
}

// ============================================================================
// PANEL DESCRIPTION
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DetectorInfo {
    pub id: &'static str,
    pub reason: &'static str,
    pub weight: u32,
    pub position: usize,
}

// ============================================================================
// PANEL ERRORS
// ============================================================================

/// The detector panel cannot be established
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("detector already registered: {0}")]
    DuplicateDetector(String),

    #[error("detector '{detector}' was built for layout {actual:08x}, panel expects {expected:08x}")]
    SchemaMismatch {
        detector: String,
        expected: u32,
        actual: u32,
    },

    #[error("detector panel is empty")]
    Empty,

    #[error(transparent)]
    Detector(#[from] DetectorError),
}
