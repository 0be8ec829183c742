//! Guard facade
//!
//! Owns the live configuration and the warning history, and is what an
//! execution layer calls before signing or broadcasting a transaction.


use std::sync::{Arc, Mutex, RwLock};

use log::{info, warn};

use crate::cache::CacheStats;
use crate::config::GuardConfig;
use crate::detector::PatternDetector;
use crate::errors::GuardResult;
use crate::gateway::RiskGatewayClient;
use crate::models::{SecurityWarning, Transaction, ValidationResult};
use crate::policy::PolicyEngine;

/// Transaction guard
#[derive(Debug)]
pub struct Guard {
    config: RwLock<Arc<GuardConfig>>,
    engine: PolicyEngine,
    history: Mutex<Vec<SecurityWarning>>,
}

impl Guard {
    /// Guard without a risk gateway; asset risk is not assessed
    pub fn new(config: GuardConfig) -> GuardResult<Self> {
        Self::with_engine(config, PolicyEngine::new(PatternDetector::new()))
    }

    /// Guard assessing asset risk through `client`
    pub fn with_risk_gateway(config: GuardConfig, client: RiskGatewayClient) -> GuardResult<Self> {
        Self::with_engine(config, PolicyEngine::new(PatternDetector::new()).with_risk_client(client))
    }

    /// Guard with a fully custom engine
    pub fn with_engine(config: GuardConfig, engine: PolicyEngine) -> GuardResult<Self> {
        config.validate()?;
        Ok(Self {
            config: RwLock::new(Arc::new(config)),
            engine,
            history: Mutex::new(Vec::new()),
        })
    }

    /// Validate a transaction and record its warnings.
    ///
    /// The config snapshot is captured once on entry, so a concurrent
    /// [`Guard::update_config`] does not affect a call already in progress.
    pub async fn validate_transaction(&self, transaction: &Transaction) -> GuardResult<ValidationResult> {
        let config = self.config();
        let result = self.engine.evaluate(transaction, &config).await?;

        if !result.warnings.is_empty() {
            self.history
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .extend(result.warnings.iter().cloned());
        }
        Ok(result)
    }

    /// Legacy boolean check.
    ///
    /// `None` validates an empty transaction, which only fails on the
    /// emergency stop or a custom rule. Errors count as invalid.
    pub async fn validate(&self, transaction: Option<&Transaction>) -> bool {
        let empty;
        let transaction = match transaction {
            Some(tx) => tx,
            None => {
                empty = Transaction::default();
                &empty
            }
        };

        match self.validate_transaction(transaction).await {
            Ok(result) => result.is_valid,
            Err(e) => {
                warn!("Validation of {} failed: {}", transaction.id, e);
                false
            }
        }
    }

    /// Current configuration snapshot
    pub fn config(&self) -> Arc<GuardConfig> {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the whole configuration after validating it
    pub fn update_config(&self, config: GuardConfig) -> GuardResult<()> {
        config.validate()?;
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(config);
        info!("Guard configuration updated");
        Ok(())
    }

    /// Block every transaction until deactivated
    pub fn activate_emergency_stop(&self) {
        self.set_emergency_stop(true);
        warn!("Emergency stop activated");
    }

    pub fn deactivate_emergency_stop(&self) {
        self.set_emergency_stop(false);
        info!("Emergency stop deactivated");
    }

    fn set_emergency_stop(&self, engaged: bool) {
        let mut current = self.config.write().unwrap_or_else(|e| e.into_inner());
        *current = Arc::new(current.with_emergency_stop(engaged));
    }

    pub fn is_emergency_stopped(&self) -> bool {
        self.config().emergency_stop
    }

    /// Every warning recorded since the last clear
    pub fn warning_history(&self) -> Vec<SecurityWarning> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_warning_history(&self) {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Risk cache statistics, if a risk gateway is attached
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.engine.risk_client().map(|client| client.cache_stats())
    }
}
