//! Playbook Catalog - remediation steps per reason label

use std::collections::HashMap;

use crate::logic::detectors::reasons;

// Steps shared between reasons are spelled identically so they deduplicate.
const BLOCK_AT_WAF: &str = "Block the source IP at the web application firewall";
const RATE_LIMIT_EDGE: &str = "Rate-limit the source IP at the network edge";

#[derive(Debug, Clone, Default)]
pub struct PlaybookCatalog {
    steps: HashMap<String, Vec<String>>,
}

impl PlaybookCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog for the built-in reason labels
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert(reasons::SQL_INJECTION, &[
            BLOCK_AT_WAF,
            "Review database query logs for the targeted endpoint",
            "Verify parameterized queries on the affected route",
        ]);
        catalog.insert(reasons::CROSS_SITE_SCRIPTING, &[
            BLOCK_AT_WAF,
            "Encode and sanitize user input on the affected route",
            "Review Content-Security-Policy headers",
        ]);
        catalog.insert(reasons::STATISTICAL_ANOMALY, &[
            RATE_LIMIT_EDGE,
            "Inspect flow volume for DDoS indicators",
            "Escalate to network operations",
        ]);
        catalog.insert(reasons::STRUCTURAL_ANOMALY, &[
            RATE_LIMIT_EDGE,
            "Capture packets for protocol analysis",
            "Verify TCP handshake handling on the target service",
        ]);
        catalog
    }

    /// Replace the steps for a reason
    pub fn insert(&mut self, reason: &str, steps: &[&str]) {
        self.steps.insert(
            reason.to_string(),
            steps.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn get(&self, reason: &str) -> Option<&[String]> {
        self.steps.get(reason).map(Vec::as_slice)
    }

    /// Concatenate steps for `reasons` in order, keeping the first occurrence of each step
    pub fn steps_for<S: AsRef<str>>(&self, reasons: &[S]) -> Vec<String> {
        let mut playbook: Vec<String> = Vec::new();
        for reason in reasons {
            let Some(steps) = self.get(reason.as_ref()) else { continue };
            for step in steps {
                if !playbook.contains(step) {
                    playbook.push(step.clone());
                }
            }
        }
        playbook
    }
}
