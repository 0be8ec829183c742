//! Guard configuration
//!
//! A [`GuardConfig`] is an immutable snapshot. The guard replaces it as a
//! whole and never patches it in place. Every constructor path that accepts
//! outside input runs [`GuardConfig::validate`] before the snapshot is used.


use std::path::Path;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::constants::{
    DEFAULT_CACHE_TTL_MS, DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_MAX_SLIPPAGE, DEFAULT_RISK_THRESHOLD,
};
use crate::errors::{ErrorExt, GuardError, GuardResult};
use crate::policy::rules::RuleSet;

/// Which detected severities become blocking causes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    /// Critical and Warning patterns block
    Strict,
    /// Only Critical patterns block
    #[default]
    Moderate,
    /// Only irreversible patterns (P-101, P-102) block
    Permissive,
}

impl std::str::FromStr for RiskTolerance {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(RiskTolerance::Strict),
            "moderate" => Ok(RiskTolerance::Moderate),
            "permissive" => Ok(RiskTolerance::Permissive),
            other => Err(GuardError::Config(format!("unknown risk tolerance '{}'", other))),
        }
    }
}

/// What a failed validation means for the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    /// Blocking causes make the transaction invalid
    #[default]
    Block,
    /// Blocking causes are reported but the transaction stays valid
    Warn,
}

impl std::str::FromStr for OperationMode {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "block" => Ok(OperationMode::Block),
            "warn" => Ok(OperationMode::Warn),
            other => Err(GuardError::Config(format!("unknown operation mode '{}'", other))),
        }
    }
}

/// Risk gateway settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskGatewayConfig {
    /// Whether assets are assessed at all
    pub enabled: bool,
    /// Risk score above which an asset blocks, in `0.0..=1.0`
    pub risk_threshold: f64,
    /// Lifetime of a cached assessment
    pub cache_ttl_ms: u64,
    /// Treat gateway failures as "unscored" instead of failing validation
    pub fallback_on_error: bool,
    /// Maximum concurrent fetches in a batch
    pub max_concurrency: usize,
    /// Per-fetch timeout
    pub fetch_timeout_ms: u64,
    /// Base URL of the HTTP risk API
    pub endpoint: Option<String>,
    /// API key sent to the HTTP risk API
    pub api_key: Option<String>,
}

impl Default for RiskGatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            risk_threshold: DEFAULT_RISK_THRESHOLD,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            fallback_on_error: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            endpoint: None,
            api_key: None,
        }
    }
}

impl RiskGatewayConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Reject out-of-range values
    pub fn validate(&self) -> GuardResult<()> {
        if !(0.0..=1.0).contains(&self.risk_threshold) {
            return Err(GuardError::Config(format!(
                "risk_threshold must be within 0..=1, got {}",
                self.risk_threshold
            )));
        }
        if self.cache_ttl_ms == 0 {
            return Err(GuardError::Config("cache_ttl_ms must be positive".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(GuardError::Config("max_concurrency must be positive".to_string()));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(GuardError::Config("fetch_timeout_ms must be positive".to_string()));
        }
        if let Some(endpoint) = &self.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(GuardError::Config(format!(
                    "endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
        }
        Ok(())
    }
}

/// Configuration snapshot used by one validation call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Maximum accepted slippage as a fraction (0.01 = 1%)
    pub max_slippage: f64,
    /// Block every transaction unconditionally
    pub emergency_stop: bool,
    /// Run the instruction pattern detector
    pub pattern_detection: bool,
    pub risk_tolerance: RiskTolerance,
    pub mode: OperationMode,
    /// Caller-supplied rules; not part of the file format
    #[serde(skip)]
    pub custom_rules: RuleSet,
    pub risk_gateway: RiskGatewayConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_slippage: DEFAULT_MAX_SLIPPAGE,
            emergency_stop: false,
            pattern_detection: true,
            risk_tolerance: RiskTolerance::default(),
            mode: OperationMode::default(),
            custom_rules: RuleSet::default(),
            risk_gateway: RiskGatewayConfig::default(),
        }
    }
}

impl GuardConfig {
    /// Reject malformed values; nothing is clamped
    pub fn validate(&self) -> GuardResult<()> {
        if !self.max_slippage.is_finite() || self.max_slippage < 0.0 {
            return Err(GuardError::Config(format!(
                "max_slippage must be a non-negative number, got {}",
                self.max_slippage
            )));
        }
        self.risk_gateway.validate()
    }

    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> GuardResult<Self> {
        let config: GuardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn from_file(path: &Path) -> GuardResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(GuardError::from)
            .with_simple_context("config", "read config file")?;
        Self::from_json_str(&json)
    }

    /// Copy of this snapshot with the emergency stop set to `engaged`
    pub fn with_emergency_stop(&self, engaged: bool) -> Self {
        Self {
            emergency_stop: engaged,
            ..self.clone()
        }
    }
}
