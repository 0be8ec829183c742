//! A security validation engine for Solana transactions
//!
//! The crate inspects a decoded transaction before it is signed or broadcast.
//! It flags dangerous instruction shapes such as an irrevocably removed mint
//! authority, scores the referenced assets through a cached risk gateway,
//! and folds everything into a single block/warn decision under a
//! configurable risk tolerance.
//!
//! ```no_run
//! # async fn run() -> solana_tx_guard::GuardResult<()> {
//! use solana_tx_guard::{Guard, GuardConfig, Transaction};
//!
//! let guard = Guard::new(GuardConfig::default())?;
//! let result = guard.validate_transaction(&Transaction::new("tx")).await?;
//! if !result.is_valid {
//!     println!("blocked by {:?}", result.blocked_by);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod detector;
pub mod errors;
pub mod gateway;
pub mod guard;
pub mod models;
pub mod policy;

pub use cache::RiskCache;
pub use config::{GuardConfig, OperationMode, RiskGatewayConfig, RiskTolerance};
pub use decoder::wire::parse_transaction;
pub use detector::PatternDetector;
pub use errors::{GuardError, GuardResult};
pub use gateway::{HttpRiskGateway, RiskGateway, RiskGatewayClient};
pub use guard::Guard;
pub use models::{
    BlockCause, Instruction, PatternId, RiskMetrics, SecurityWarning, Severity, Transaction,
    ValidationResult,
};
pub use policy::{FnRule, PolicyEngine, RuleSet, ValidationRule};

/// Older names for the guard facade
pub type Guardian = Guard;
pub type AegisFlowGuard = Guard;

/// Older names for the risk gateway client
pub type Pulsar = RiskGatewayClient;

/// Older names for the policy engine
pub type FlowEngine = PolicyEngine;

/// Version of the transaction guard
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
