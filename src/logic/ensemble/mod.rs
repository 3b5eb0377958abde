//! Ensemble Module - detector panel, verdict aggregation and playbooks

pub mod aggregator;
pub mod playbook;
pub mod types;

pub use aggregator::{DetectorPanel, EnsembleAggregator, MAX_RISK_SCORE};
pub use playbook::PlaybookCatalog;
pub use types::{DegradedDetector, DetectorInfo, PanelError, Verdict, REASON_SEPARATOR};
