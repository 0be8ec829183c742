//! Risk gateway access
//!
//! [`RiskGateway`] is the external risk API. [`RiskGatewayClient`] wraps one
//! with the [`RiskCache`]: cache first, fetch on miss, store with the
//! configured TTL.
//!
//! Fetches are plain futures. Dropping an in-flight `assess` or
//! `assess_batch` cancels its outstanding fetches, and a fetch that
//! completed before the drop has already been cached, which is harmless
//! because `put` is idempotent.

pub mod http;
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use solana_pubkey::Pubkey;

use crate::cache::{CacheStats, RiskCache};
use crate::config::RiskGatewayConfig;
use crate::errors::{ErrorContext, ErrorExt, GuardError, GuardResult};
use crate::models::RiskMetrics;

pub use self::http::HttpRiskGateway;

/// External source of risk metrics
#[async_trait]
pub trait RiskGateway: Send + Sync {
    /// Fetch fresh metrics for `asset`
    async fn fetch_risk_metrics(&self, asset: &Pubkey) -> GuardResult<RiskMetrics>;
}

/// Cache-first client for a [`RiskGateway`]
#[derive(Clone)]
pub struct RiskGatewayClient {
    gateway: Arc<dyn RiskGateway>,
    cache: Arc<RiskCache>,
    config: RiskGatewayConfig,
}

impl std::fmt::Debug for RiskGatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskGatewayClient")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RiskGatewayClient {
    /// Client with default settings
    pub fn new(gateway: Arc<dyn RiskGateway>, cache: Arc<RiskCache>) -> Self {
        Self {
            gateway,
            cache,
            config: RiskGatewayConfig::default(),
        }
    }

    /// Same gateway and cache, different settings
    pub fn with_config(&self, config: RiskGatewayConfig) -> Self {
        Self {
            gateway: self.gateway.clone(),
            cache: self.cache.clone(),
            config,
        }
    }

    pub fn config(&self) -> &RiskGatewayConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<RiskCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Metrics for one asset
    pub async fn assess(&self, asset: &Pubkey) -> GuardResult<RiskMetrics> {
        if let Some(metrics) = self.cache.get(asset) {
            debug!("Risk cache hit for {}", asset);
            return Ok(metrics);
        }
        self.fetch(*asset).await
    }

    /// Metrics for several assets.
    ///
    /// Duplicates are assessed once. Cache hits are never re-fetched, and
    /// misses are fetched concurrently up to `max_concurrency` at a time.
    pub async fn assess_batch(&self, assets: &[Pubkey]) -> GuardResult<HashMap<Pubkey, RiskMetrics>> {
        let mut results = HashMap::with_capacity(assets.len());
        let mut misses = Vec::new();

        for asset in assets {
            if results.contains_key(asset) || misses.contains(asset) {
                continue;
            }
            match self.cache.get(asset) {
                Some(metrics) => {
                    results.insert(*asset, metrics);
                }
                None => misses.push(*asset),
            }
        }

        if misses.is_empty() {
            debug!("All {} assets served from the risk cache", results.len());
            return Ok(results);
        }

        info!(
            "Fetching risk metrics for {} assets ({} cached)",
            misses.len(),
            results.len()
        );

        let fetched: Vec<(Pubkey, RiskMetrics)> = stream::iter(misses)
            .map(|asset| async move { self.fetch(asset).await.map(|metrics| (asset, metrics)) })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .try_collect()
            .await?;

        results.extend(fetched);
        Ok(results)
    }

    async fn fetch(&self, asset: Pubkey) -> GuardResult<RiskMetrics> {
        let outcome = match tokio::time::timeout(
            self.config.fetch_timeout(),
            self.gateway.fetch_risk_metrics(&asset),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GuardError::Gateway(format!(
                "fetch timed out after {}ms",
                self.config.fetch_timeout_ms
            ))),
        };

        match outcome {
            Ok(metrics) => {
                self.cache.put(asset, metrics.clone(), self.config.cache_ttl());
                Ok(metrics)
            }
            Err(e) if self.config.fallback_on_error => {
                warn!("Risk gateway failed for {}, treating it as unscored: {}", asset, e);
                Ok(RiskMetrics::neutral())
            }
            Err(e) => Err::<RiskMetrics, _>(e).with_context(ErrorContext {
                address: Some(asset.to_string()),
                component: "risk_gateway".to_string(),
                operation: "fetch_risk_metrics".to_string(),
            }),
        }
    }
}
