//! HTTP risk gateway

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use solana_pubkey::Pubkey;

use crate::config::RiskGatewayConfig;
use crate::errors::{GuardError, GuardResult};
use crate::gateway::RiskGateway;
use crate::models::RiskMetrics;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Risk gateway speaking JSON over HTTP.
///
/// `GET {endpoint}/risk/{asset}` must answer with a [`RiskMetrics`] object.
#[derive(Debug, Clone)]
pub struct HttpRiskGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpRiskGateway {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Build from a gateway config, which must name an endpoint
    pub fn from_config(config: &RiskGatewayConfig) -> GuardResult<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| GuardError::Config("risk gateway endpoint is not configured".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .build()
            .map_err(|e| GuardError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// URL queried for `asset`
    pub fn url_for(&self, asset: &Pubkey) -> String {
        format!("{}/risk/{}", self.endpoint, asset)
    }
}

#[async_trait]
impl RiskGateway for HttpRiskGateway {
    async fn fetch_risk_metrics(&self, asset: &Pubkey) -> GuardResult<RiskMetrics> {
        let url = self.url_for(asset);
        debug!("GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GuardError::Gateway(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GuardError::Gateway(format!("{} answered {}", url, status)));
        }

        response
            .json::<RiskMetrics>()
            .await
            .map_err(|e| GuardError::Gateway(format!("invalid risk payload from {}: {}", url, e)))
    }
}
