//! Traffic templates for the synthetic source
//!
//! Every entry is `(feature, low, high)`; `low == high` marks a constant.
//! Features absent from a template are 0. Attack templates start from the
//! benign profile and override a handful of features.

use serde::{Deserialize, Serialize};

pub type FeatureRange = (&'static str, f32, f32);

/// Relative jitter applied to every positive value
pub const JITTER: f32 = 0.1;

/// Counts that stay exact
pub const UNJITTERED: &[&str] = &["Total Fwd Packets", "Fwd Packets Length Total"];

pub const BENIGN_PROFILE: &[FeatureRange] = &[
    ("Protocol", 6.0, 6.0),
    ("Flow Duration", 50_000.0, 200_000.0),
    ("Total Fwd Packets", 2.0, 2.0),
    ("Total Backward Packets", 2.0, 2.0),
    ("Fwd Packets Length Total", 50.0, 200.0),
    ("Bwd Packets Length Total", 100.0, 3_000.0),
    ("Fwd Packet Length Max", 50.0, 200.0),
    ("Fwd Packet Length Mean", 25.0, 100.0),
    ("Fwd Packet Length Std", 0.0, 50.0),
    ("Bwd Packet Length Max", 50.0, 1_500.0),
    ("Bwd Packet Length Mean", 50.0, 750.0),
    ("Bwd Packet Length Std", 0.0, 300.0),
    ("Flow Bytes/s", 1_000.0, 5_000.0),
    ("Flow Packets/s", 10.0, 40.0),
    ("Flow IAT Mean", 10_000.0, 50_000.0),
    ("Flow IAT Std", 0.0, 20_000.0),
    ("Flow IAT Max", 30_000.0, 100_000.0),
    ("Flow IAT Min", 1_000.0, 10_000.0),
    ("Fwd IAT Total", 20_000.0, 100_000.0),
    ("Fwd IAT Mean", 10_000.0, 50_000.0),
    ("Fwd IAT Std", 0.0, 20_000.0),
    ("Fwd IAT Max", 10_000.0, 50_000.0),
    ("Fwd IAT Min", 1_000.0, 10_000.0),
    ("Bwd IAT Total", 20_000.0, 100_000.0),
    ("Bwd IAT Mean", 10_000.0, 50_000.0),
    ("Bwd IAT Std", 0.0, 20_000.0),
    ("Bwd IAT Max", 10_000.0, 50_000.0),
    ("Bwd IAT Min", 1_000.0, 10_000.0),
    ("Fwd PSH Flags", 1.0, 1.0),
    ("Fwd Header Length", 40.0, 40.0),
    ("Bwd Header Length", 40.0, 40.0),
    ("Fwd Packets/s", 5.0, 20.0),
    ("Bwd Packets/s", 5.0, 20.0),
    ("Packet Length Max", 50.0, 1_500.0),
    ("Packet Length Mean", 50.0, 500.0),
    ("Packet Length Std", 0.0, 200.0),
    ("Packet Length Variance", 0.0, 40_000.0),
    ("PSH Flag Count", 1.0, 1.0),
    ("ACK Flag Count", 1.0, 1.0),
    ("Down/Up Ratio", 1.0, 1.0),
    ("Avg Packet Size", 50.0, 600.0),
    ("Avg Fwd Segment Size", 25.0, 100.0),
    ("Avg Bwd Segment Size", 50.0, 750.0),
    ("Subflow Fwd Packets", 2.0, 2.0),
    ("Subflow Fwd Bytes", 50.0, 200.0),
    ("Subflow Bwd Packets", 2.0, 2.0),
    ("Subflow Bwd Bytes", 100.0, 3_000.0),
    ("Init Fwd Win Bytes", 8_192.0, 8_192.0),
    ("Init Bwd Win Bytes", 8_192.0, 8_192.0),
    ("Fwd Act Data Packets", 1.0, 1.0),
    ("Fwd Seg Size Min", 20.0, 20.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttackKind {
    SqlInjection,
    XssAttack,
    StatisticalAnomaly,
    StructuralAnomaly,
}

impl AttackKind {
    pub const ALL: [AttackKind; 4] = [
        AttackKind::SqlInjection,
        AttackKind::XssAttack,
        AttackKind::StatisticalAnomaly,
        AttackKind::StructuralAnomaly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttackKind::SqlInjection => "SQL_INJECTION",
            AttackKind::XssAttack => "XSS_ATTACK",
            AttackKind::StatisticalAnomaly => "STATISTICAL_ANOMALY",
            AttackKind::StructuralAnomaly => "STRUCTURAL_ANOMALY",
        }
    }

    pub fn template(&self) -> &'static AttackTemplate {
        match self {
            AttackKind::SqlInjection => &SQL_INJECTION,
            AttackKind::XssAttack => &XSS_ATTACK,
            AttackKind::StatisticalAnomaly => &STATISTICAL_ANOMALY,
            AttackKind::StructuralAnomaly => &STRUCTURAL_ANOMALY,
        }
    }
}

pub struct AttackTemplate {
    pub path: &'static str,
    pub user_agent: &'static str,
    pub overrides: &'static [FeatureRange],
}

const SQL_INJECTION: AttackTemplate = AttackTemplate {
    path: "/products.php?id=1' OR '1'='1",
    user_agent: "sqlmap/1.6",
    overrides: &[
        ("Fwd Packets Length Total", 400.0, 800.0),
        ("Fwd Act Data Packets", 6.0, 12.0),
        ("Fwd Packet Length Mean", 50.0, 150.0),
        ("Flow Duration", 5_000.0, 20_000.0),
    ],
};

const XSS_ATTACK: AttackTemplate = AttackTemplate {
    path: "/search?q=<script>alert('XSS')</script>",
    user_agent: "Mozilla/5.0",
    overrides: &[
        ("Fwd Packet Length Max", 900.0, 1_400.0),
        ("Fwd Packet Length Std", 150.0, 400.0),
        ("Flow Duration", 10_000.0, 50_000.0),
    ],
};

const STATISTICAL_ANOMALY: AttackTemplate = AttackTemplate {
    path: "/api/v2/metrics",
    user_agent: "Internal-Scanner/1.0",
    overrides: &[
        ("Flow Duration", 1.0, 100.0),
        ("Total Fwd Packets", 1_000.0, 5_000.0),
        ("Flow Packets/s", 100_000.0, 900_000.0),
        ("Fwd Packets/s", 100_000.0, 900_000.0),
        ("Init Fwd Win Bytes", 0.0, 0.0),
    ],
};

const STRUCTURAL_ANOMALY: AttackTemplate = AttackTemplate {
    path: "/auth/token",
    user_agent: "Go-http-client/1.1",
    overrides: &[
        ("Total Fwd Packets", 10.0, 10.0),
        ("Fwd Packets Length Total", 0.0, 0.0),
        ("Fwd Packet Length Max", 0.0, 0.0),
        ("Fwd Packet Length Mean", 0.0, 0.0),
        ("Fwd Packet Length Std", 0.0, 0.0),
        ("Flow Bytes/s", 0.0, 0.0),
        ("ACK Flag Count", 0.0, 0.0),
        ("SYN Flag Count", 1.0, 1.0),
    ],
};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const BENIGN_PATHS: &[&str] = &["/api/v1/users", "/assets/img.png", "/search/blog", "/"];
pub const METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE"];
pub const BENIGN_STATUSES: &[u16] = &[200, 201, 304];
pub const ATTACK_STATUSES: &[u16] = &[200, 201, 304, 404, 500];

/// (city, country, latitude, longitude)
pub const CITIES: &[(&str, &str, f64, f64)] = &[
    ("Ashburn", "United States", 39.0438, -77.4874),
    ("Frankfurt am Main", "Germany", 50.1109, 8.6821),
    ("Amsterdam", "Netherlands", 52.3676, 4.9041),
    ("Singapore", "Singapore", 1.3521, 103.8198),
    ("Sao Paulo", "Brazil", -23.5505, -46.6333),
    ("Moscow", "Russia", 55.7558, 37.6173),
    ("Beijing", "China", 39.9042, 116.4074),
    ("Mumbai", "India", 19.0760, 72.8777),
    ("Lagos", "Nigeria", 6.5244, 3.3792),
    ("Sydney", "Australia", -33.8688, 151.2093),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::feature_index;

    #[test]
    fn test_every_template_feature_exists_in_layout() {
        let overrides = AttackKind::ALL.iter().flat_map(|k| k.template().overrides.iter());
        for (name, low, high) in BENIGN_PROFILE.iter().chain(overrides) {
            assert!(feature_index(name).is_some(), "unknown feature {name}");
            assert!(low <= high, "inverted range for {name}");
        }
    }

    #[test]
    fn test_attack_kind_serializes_as_label() {
        let json = serde_json::to_string(&AttackKind::XssAttack).unwrap();
        assert_eq!(json, "\"XSS_ATTACK\"");
        assert_eq!(AttackKind::XssAttack.as_str(), "XSS_ATTACK");
    }
}
