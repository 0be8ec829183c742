//! Validation policy engine
//!
//! Combines pattern findings, asset risk, custom rules, slippage and the
//! emergency stop into one [`ValidationResult`]. The engine holds no
//! mutable state: every call works on the config snapshot it is given.

pub mod rules;
#[cfg(test)]
mod tests;

use log::{debug, info, warn};

use crate::config::{GuardConfig, OperationMode, RiskTolerance};
use crate::detector::PatternDetector;
use crate::errors::GuardResult;
use crate::gateway::RiskGatewayClient;
use crate::models::{BlockCause, PatternId, SecurityWarning, Severity, Transaction, ValidationResult};

pub use self::rules::{FnRule, RuleSet, ValidationRule};

/// Decides whether a transaction may be submitted
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    detector: PatternDetector,
    risk_client: Option<RiskGatewayClient>,
}

impl PolicyEngine {
    /// Engine without risk assessment
    pub fn new(detector: PatternDetector) -> Self {
        Self {
            detector,
            risk_client: None,
        }
    }

    /// Attach a risk gateway client
    pub fn with_risk_client(mut self, client: RiskGatewayClient) -> Self {
        self.risk_client = Some(client);
        self
    }

    pub fn risk_client(&self) -> Option<&RiskGatewayClient> {
        self.risk_client.as_ref()
    }

    /// Evaluate `transaction` under `config`.
    ///
    /// The risk gateway fetch is the only await point. A gateway failure
    /// without `fallback_on_error` is returned as an error: the transaction
    /// is then neither accepted nor rejected.
    pub async fn evaluate(&self, transaction: &Transaction, config: &GuardConfig) -> GuardResult<ValidationResult> {
        let mut result = ValidationResult::new(transaction.id.clone());

        if config.emergency_stop {
            warn!("Emergency stop engaged, blocking transaction {}", transaction.id);
            result.block(BlockCause::EmergencyStop);
            result.is_valid = false;
            return Ok(result);
        }

        let patterns = if config.pattern_detection {
            self.detector.detect(transaction)
        } else {
            Vec::new()
        };
        result.warnings.extend(patterns.iter().cloned());

        self.check_asset_risk(transaction, config, &mut result).await?;

        for name in config.custom_rules.failing(transaction) {
            debug!("Rule '{}' rejected transaction {}", name, transaction.id);
            result.block(BlockCause::Rule(name));
        }

        if let Some(actual) = transaction.slippage {
            if !is_slippage_acceptable(config, actual) {
                result.warnings.push(SecurityWarning::new(
                    PatternId::SlippageExceeded,
                    format!("Slippage {} exceeds the maximum of {}", actual, config.max_slippage),
                    None,
                ));
                result.block(BlockCause::Slippage);
            }
        }

        if transaction.privacy_without_compression() {
            result.warnings.push(SecurityWarning::new(
                PatternId::PrivacyUncompressed,
                "Privacy requested but compression is disabled",
                None,
            ));
        }

        for warning in &patterns {
            if blocks_under(config.risk_tolerance, warning) {
                result.block(BlockCause::Pattern(warning.pattern));
            }
        }

        result.is_valid = result.blocked_by.is_empty() || config.mode == OperationMode::Warn;

        info!(
            "Transaction {} evaluated: valid={} warnings={} blocked_by=[{}]",
            transaction.id,
            result.is_valid,
            result.warnings.len(),
            result
                .blocked_by
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(result)
    }

    async fn check_asset_risk(
        &self,
        transaction: &Transaction,
        config: &GuardConfig,
        result: &mut ValidationResult,
    ) -> GuardResult<()> {
        if !config.risk_gateway.enabled || transaction.asset_addresses.is_empty() {
            return Ok(());
        }
        let client = match &self.risk_client {
            Some(client) => client.with_config(config.risk_gateway.clone()),
            None => {
                warn!("No risk gateway attached, assets of {} were not assessed", transaction.id);
                result.warnings.push(SecurityWarning::new(
                    PatternId::RiskUnassessed,
                    format!(
                        "Risk assessment is enabled but no gateway is attached; {} assets were not assessed",
                        transaction.asset_addresses.len()
                    ),
                    None,
                ));
                return Ok(());
            }
        };

        let metrics = client.assess_batch(&transaction.asset_addresses).await?;
        let threshold = config.risk_gateway.risk_threshold;

        // Walk the transaction's order, not the map's
        let mut seen = Vec::new();
        for asset in &transaction.asset_addresses {
            if seen.contains(asset) {
                continue;
            }
            seen.push(*asset);

            if let Some(score) = metrics.get(asset).and_then(|m| m.risk_score) {
                if score > threshold {
                    result.warnings.push(SecurityWarning::new(
                        PatternId::RiskThreshold,
                        format!("Asset {} has risk score {} above threshold {}", asset, score, threshold),
                        Some(*asset),
                    ));
                    result.block(BlockCause::RiskThreshold(*asset));
                }
            }
        }
        Ok(())
    }
}

/// Whether `actual` slippage is within the configured maximum
pub fn is_slippage_acceptable(config: &GuardConfig, actual: f64) -> bool {
    actual.is_finite() && actual <= config.max_slippage
}

/// Whether a detector finding blocks under `tolerance`
fn blocks_under(tolerance: RiskTolerance, warning: &SecurityWarning) -> bool {
    if !warning.pattern.is_instruction_pattern() {
        return false;
    }
    match tolerance {
        RiskTolerance::Strict => matches!(warning.severity, Severity::Critical | Severity::Warning),
        RiskTolerance::Moderate => warning.severity == Severity::Critical,
        RiskTolerance::Permissive => warning.pattern.is_irreversible(),
    }
}
