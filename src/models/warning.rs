//! Security warnings and validation results

use std::fmt;

use serde::{Serialize, Serializer, Deserialize};
use solana_pubkey::Pubkey;

use crate::constants::{EMERGENCY_STOP, SLIPPAGE_EXCEEDED};

/// How serious a warning is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Warning,
    Alert,
}

/// Identifier of the check that produced a warning.
///
/// The first four are instruction patterns found by the detector. The rest
/// are synthesized by the policy engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternId {
    #[serde(rename = "P-101")]
    MintKill,
    #[serde(rename = "P-102")]
    FreezeKill,
    #[serde(rename = "P-103")]
    SignerMismatch,
    #[serde(rename = "P-104")]
    DangerousClose,
    #[serde(rename = "RISK-THRESHOLD")]
    RiskThreshold,
    #[serde(rename = "SLIPPAGE-EXCEEDED")]
    SlippageExceeded,
    #[serde(rename = "PRIVACY-UNCOMPRESSED")]
    PrivacyUncompressed,
    #[serde(rename = "DECODE-FAILURE")]
    DecodeFailure,
    #[serde(rename = "RISK-UNASSESSED")]
    RiskUnassessed,
}

impl PatternId {
    /// Stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternId::MintKill => "P-101",
            PatternId::FreezeKill => "P-102",
            PatternId::SignerMismatch => "P-103",
            PatternId::DangerousClose => "P-104",
            PatternId::RiskThreshold => "RISK-THRESHOLD",
            PatternId::SlippageExceeded => "SLIPPAGE-EXCEEDED",
            PatternId::PrivacyUncompressed => "PRIVACY-UNCOMPRESSED",
            PatternId::DecodeFailure => "DECODE-FAILURE",
            PatternId::RiskUnassessed => "RISK-UNASSESSED",
        }
    }

    /// Severity the pattern is always reported with
    pub fn severity(&self) -> Severity {
        match self {
            PatternId::MintKill | PatternId::FreezeKill | PatternId::RiskThreshold => Severity::Critical,
            PatternId::SignerMismatch
            | PatternId::SlippageExceeded
            | PatternId::PrivacyUncompressed => Severity::Warning,
            PatternId::DangerousClose
            | PatternId::DecodeFailure
            | PatternId::RiskUnassessed => Severity::Alert,
        }
    }

    /// True for the instruction patterns subject to risk-tolerance filtering
    pub fn is_instruction_pattern(&self) -> bool {
        matches!(
            self,
            PatternId::MintKill
                | PatternId::FreezeKill
                | PatternId::SignerMismatch
                | PatternId::DangerousClose
        )
    }

    /// Patterns whose effect cannot be undone once executed
    pub fn is_irreversible(&self) -> bool {
        matches!(self, PatternId::MintKill | PatternId::FreezeKill)
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityWarning {
    /// Check that fired
    pub pattern: PatternId,
    /// Severity of the finding
    pub severity: Severity,
    /// Human readable description
    pub message: String,
    /// Account the finding is about, if any
    pub account: Option<Pubkey>,
}

impl SecurityWarning {
    /// Warning for `pattern` with its default severity
    pub fn new(pattern: PatternId, message: impl Into<String>, account: Option<Pubkey>) -> Self {
        Self {
            pattern,
            severity: pattern.severity(),
            message: message.into(),
            account,
        }
    }
}

/// Why a transaction was blocked
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockCause {
    /// The emergency stop is engaged
    EmergencyStop,
    /// An instruction pattern passed the risk-tolerance filter
    Pattern(PatternId),
    /// The asset's risk score exceeded the configured threshold
    RiskThreshold(Pubkey),
    /// A custom rule failed
    Rule(String),
    /// Actual slippage exceeded the configured maximum
    Slippage,
}

impl fmt::Display for BlockCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockCause::EmergencyStop => f.write_str(EMERGENCY_STOP),
            BlockCause::Pattern(id) => write!(f, "{}", id),
            BlockCause::RiskThreshold(asset) => write!(f, "{}", asset),
            BlockCause::Rule(name) => f.write_str(name),
            BlockCause::Slippage => f.write_str(SLIPPAGE_EXCEEDED),
        }
    }
}

impl Serialize for BlockCause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of one validation call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// Id of the validated transaction
    pub transaction_id: String,
    /// Whether the caller may submit the transaction
    pub is_valid: bool,
    /// Findings in detection order
    pub warnings: Vec<SecurityWarning>,
    /// Blocking causes, without duplicates, in the order they were decided
    pub blocked_by: Vec<BlockCause>,
}

impl ValidationResult {
    /// Empty, valid result
    pub fn new(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            is_valid: true,
            warnings: Vec::new(),
            blocked_by: Vec::new(),
        }
    }

    /// Record a blocking cause unless already present
    pub fn block(&mut self, cause: BlockCause) {
        if !self.blocked_by.contains(&cause) {
            self.blocked_by.push(cause);
        }
    }

    /// Whether `cause` is among the blocking causes
    pub fn is_blocked_by(&self, cause: &BlockCause) -> bool {
        self.blocked_by.contains(cause)
    }

    /// Ids of all warnings, in order
    pub fn warning_ids(&self) -> Vec<PatternId> {
        self.warnings.iter().map(|w| w.pattern).collect()
    }
}
