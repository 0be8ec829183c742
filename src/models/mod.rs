//! Data models for transactions, findings and risk metrics

pub mod instruction;
pub mod transaction;
pub mod warning;
pub mod risk;

pub use self::instruction::{Instruction, AccountRef};
pub use self::transaction::{Transaction, TransactionStatus, PrivacyMetadata};
pub use self::warning::{Severity, PatternId, SecurityWarning, BlockCause, ValidationResult};
pub use self::risk::{RiskMetrics, ComplianceStatus};
