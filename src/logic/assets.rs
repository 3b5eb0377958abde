//! Asset Registry - in-memory inventory of known hosts
//!
//! Written only by the pipeline (auto-registration of unseen source IPs),
//! read by the KPI report and the assets endpoint.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Criticality {
    High,
    Medium,
    Low,
}

impl Criticality {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Criticality::High => "High",
            Criticality::Medium => "Medium",
            Criticality::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub owner: String,
    pub purpose: String,
    pub criticality: Criticality,
}

impl Asset {
    pub fn new(owner: &str, purpose: &str, criticality: Criticality) -> Self {
        Self {
            owner: owner.to_string(),
            purpose: purpose.to_string(),
            criticality,
        }
    }

    /// Record given to an IP first seen in live traffic
    pub fn auto_discovered() -> Self {
        Self::new("Unassigned", "Auto-discovered", Criticality::Low)
    }
}

/// Mock inventory loaded at startup
const SEED_INVENTORY: &[(&str, &str, &str, Criticality)] = &[
    ("10.0.0.5", "Web Platform Team", "Public Web Server", Criticality::High),
    ("10.0.0.10", "Database Team", "Primary Customer Database", Criticality::High),
    ("10.0.0.25", "Identity Team", "Authentication Gateway", Criticality::High),
    ("10.0.1.20", "IT Operations", "Internal Monitoring", Criticality::Medium),
    ("10.0.1.30", "Finance", "Payroll Workstation", Criticality::Medium),
    ("192.168.1.15", "Marketing", "Staging CMS", Criticality::Low),
    ("192.168.1.40", "Facilities", "Badge Reader Controller", Criticality::Low),
];

#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: RwLock<HashMap<String, Asset>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with the mock inventory
    pub fn seeded() -> Self {
        let assets = SEED_INVENTORY
            .iter()
            .map(|&(ip, owner, purpose, criticality)| {
                (ip.to_string(), Asset::new(owner, purpose, criticality))
            })
            .collect();
        Self {
            assets: RwLock::new(assets),
        }
    }

    pub fn lookup(&self, ip: &str) -> Option<Asset> {
        self.assets.read().get(ip).cloned()
    }

    /// Insert `asset` for `ip` unless one exists; returns true if inserted
    pub fn register_if_absent(&self, ip: &str, asset: Asset) -> bool {
        if self.assets.read().contains_key(ip) {
            return false;
        }

        let mut assets = self.assets.write();
        if assets.contains_key(ip) {
            return false;
        }
        assets.insert(ip.to_string(), asset);
        tracing::debug!(ip, "Auto-registered asset");
        true
    }

    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }

    pub fn ips(&self) -> Vec<String> {
        self.assets.read().keys().cloned().collect()
    }

    /// Sorted copy of the inventory
    pub fn snapshot(&self) -> BTreeMap<String, Asset> {
        self.assets
            .read()
            .iter()
            .map(|(ip, asset)| (ip.clone(), asset.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_seeded_inventory_lookup() {
        let registry = AssetRegistry::seeded();
        assert_eq!(registry.len(), SEED_INVENTORY.len());

        let db = registry.lookup("10.0.0.10").unwrap();
        assert_eq!(db.criticality, Criticality::High);
        assert!(registry.lookup("8.8.8.8").is_none());
    }

    #[test]
    fn test_register_if_absent_keeps_existing_record() {
        let registry = AssetRegistry::seeded();
        assert!(!registry.register_if_absent("10.0.0.10", Asset::auto_discovered()));
        assert_eq!(registry.lookup("10.0.0.10").unwrap().owner, "Database Team");

        assert!(registry.register_if_absent("203.0.113.7", Asset::auto_discovered()));
        assert_eq!(registry.lookup("203.0.113.7"), Some(Asset::auto_discovered()));
    }

    #[test]
    fn test_concurrent_registration_inserts_once() {
        let registry = Arc::new(AssetRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry.register_if_absent("198.51.100.23", Asset::auto_discovered())
                })
            })
            .collect();

        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&inserted| inserted)
            .count();

        assert_eq!(inserted, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let registry = AssetRegistry::seeded();
        let keys: Vec<String> = registry.snapshot().into_keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
