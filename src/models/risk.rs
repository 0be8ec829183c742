//! Risk metrics returned by the risk gateway

use serde::{Serialize, Deserialize};

/// Regulatory compliance status of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    UnderReview,
    NonCompliant,
}

/// Per-asset risk snapshot.
///
/// Every field is optional: an absent value means the gateway has no
/// opinion, which the policy engine treats as unscored rather than unsafe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Aggregate risk score in `0.0..=1.0`
    #[serde(default)]
    pub risk_score: Option<f64>,
    /// Compliance status
    #[serde(default)]
    pub compliance: Option<ComplianceStatus>,
    /// Counterparty risk in `0.0..=1.0`
    #[serde(default)]
    pub counterparty_risk: Option<f64>,
    /// Oracle integrity in `0.0..=1.0`, higher is better
    #[serde(default)]
    pub oracle_integrity: Option<f64>,
}

impl RiskMetrics {
    /// Metrics with every field unknown
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Metrics carrying only a risk score
    pub fn with_score(risk_score: f64) -> Self {
        Self {
            risk_score: Some(risk_score),
            ..Self::default()
        }
    }

    /// True when no field is known
    pub fn is_neutral(&self) -> bool {
        self.risk_score.is_none()
            && self.compliance.is_none()
            && self.counterparty_risk.is_none()
            && self.oracle_integrity.is_none()
    }

    /// Whether the risk score is known and strictly above `threshold`
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.risk_score.map(|score| score > threshold).unwrap_or(false)
    }
}
